//! Where the capture surface is looking.
//!
//! The map collaborator reports a [`ViewPosition`]; the coordinate-list
//! feature lets the operator paste a list of points and step through them.

mod list;

pub use list::{parse_coordinate_list, CoordinateCursor};

use std::fmt;

use serde::Serialize;

use crate::error::StreetboxError;
use crate::raster::crop::parse_f64_list;

/// A WGS84 point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Street-level camera: position plus point of view.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ViewPosition {
    pub position: LatLng,
    pub heading: f64,
    pub pitch: f64,
    pub zoom: f64,
}

impl ViewPosition {
    pub fn new(position: LatLng, heading: f64, pitch: f64, zoom: f64) -> Self {
        Self {
            position,
            heading,
            pitch,
            zoom,
        }
    }

    /// Looking straight ahead from `position`.
    pub fn at(position: LatLng) -> Self {
        Self::new(position, 0.0, 0.0, 1.0)
    }

    /// Moves the camera, keeping its point of view.
    pub fn moved_to(self, position: LatLng) -> Self {
        Self { position, ..self }
    }

    /// `lat_lng_heading_pitch_zoom`.
    pub fn to_basename(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            self.position.lat, self.position.lng, self.heading, self.pitch, self.zoom
        )
    }
}

/// Parses `lat,lng,heading,pitch,zoom`.
impl std::str::FromStr for ViewPosition {
    type Err = StreetboxError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let values = parse_f64_list(raw, 5)?;
        Ok(Self::new(
            LatLng::new(values[0], values[1]),
            values[2],
            values[3],
            values[4],
        ))
    }
}
