//! Coordinate space marker types.
//!
//! Zero-sized types used as type parameters so that on-screen coordinates and
//! true raster pixel coordinates cannot be mixed up at compile time.

use std::fmt;

/// Marker type for displayed coordinates.
///
/// These are the units the operator sees: the on-screen size of a raster,
/// which may differ from its true size because of layout scaling.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Display {}

/// Marker type for true pixel coordinates.
///
/// (0, 0) is the top-left corner of the raster's pixel buffer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

impl fmt::Debug for Display {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
