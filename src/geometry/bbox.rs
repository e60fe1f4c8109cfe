//! Axis-aligned boxes in XYXY form.

use super::coord::{Coord, ScaleFactors};
use super::space::{Display, Pixel};

/// An axis-aligned box in XYXY format (xmin, ymin, xmax, ymax).
///
/// This type does NOT enforce min <= max. Operator-drawn boxes are carried
/// as drawn, and consumers decide what a malformed box means.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    pub min: Coord<TSpace>,
    pub max: Coord<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    /// Creates a new box from explicit corner coordinates.
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            min: Coord::new(xmin, ymin),
            max: Coord::new(xmax, ymax),
        }
    }

    /// Creates a box from a top-left corner plus width and height.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_xyxy(x, y, x + width, y + height)
    }

    #[inline]
    pub fn xmin(&self) -> f64 {
        self.min.x
    }

    #[inline]
    pub fn ymin(&self) -> f64 {
        self.min.y
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.max.x
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.max.y
    }

    /// Width of the box. Negative if the box is malformed.
    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height of the box. Negative if the box is malformed.
    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// True when both sides are strictly positive.
    ///
    /// NaN sides count as empty.
    #[inline]
    pub fn has_area(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }
}

impl<TSpace> std::fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("xmin", &self.min.x)
            .field("ymin", &self.min.y)
            .field("xmax", &self.max.x)
            .field("ymax", &self.max.y)
            .finish()
    }
}

impl BBoxXYXY<Display> {
    /// Maps a displayed box onto the raster's true pixel grid.
    pub fn to_pixel(&self, factors: ScaleFactors) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_xyxy(
            self.min.x * factors.x,
            self.min.y * factors.y,
            self.max.x * factors.x,
            self.max.y * factors.y,
        )
    }
}
