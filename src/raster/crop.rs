//! Crop selections in display space.

use std::str::FromStr;

use crate::error::StreetboxError;
use crate::geometry::{BBoxXYXY, Display};

/// A crop rectangle as the operator drags it, in displayed coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Zoom factor applied about the image center.
    pub scale: f64,
    /// Rotation about the image center, in degrees.
    pub rotate: f64,
}

impl CropRegion {
    /// Creates an unscaled, unrotated region.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            scale: 1.0,
            rotate: 0.0,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotate = degrees;
        self
    }

    pub fn bounds(&self) -> BBoxXYXY<Display> {
        BBoxXYXY::from_xywh(self.x, self.y, self.width, self.height)
    }

    pub fn has_area(&self) -> bool {
        self.bounds().has_area()
    }

    /// Freezes the region for transform processing.
    pub fn commit(self) -> CommittedCrop {
        CommittedCrop(self)
    }
}

/// Parses `x,y,width,height`.
impl FromStr for CropRegion {
    type Err = StreetboxError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let values = parse_f64_list(raw, 4)?;
        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}

/// A finalized crop selection. Nothing mutates it after commit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommittedCrop(CropRegion);

impl CommittedCrop {
    pub fn region(&self) -> &CropRegion {
        &self.0
    }

    pub fn bounds(&self) -> BBoxXYXY<Display> {
        self.0.bounds()
    }

    pub fn has_area(&self) -> bool {
        self.0.has_area()
    }
}

/// Splits a comma-separated list into exactly `expected` numbers.
pub(crate) fn parse_f64_list(raw: &str, expected: usize) -> Result<Vec<f64>, StreetboxError> {
    let values = raw
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>().map_err(|_| {
                StreetboxError::InvalidArgument(format!("'{part}' is not a number in '{raw}'"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if values.len() != expected {
        return Err(StreetboxError::InvalidArgument(format!(
            "expected {expected} comma-separated values, got {} in '{raw}'",
            values.len()
        )));
    }
    Ok(values)
}
