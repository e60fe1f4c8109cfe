//! Labeled boxes drawn over a cropped raster, and the document they export to.
//!
//! Boxes are stored the way the operator draws them (top-left corner plus
//! size, in the cropped image's pixel space). The VOC encoder in [`voc`]
//! turns them into absolute corner pairs.

pub mod voc;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StreetboxError;
use crate::geometry::{BBoxXYXY, Pixel};
use crate::raster::crop::parse_f64_list;

/// Color channels recorded in every exported document.
pub const IMAGE_DEPTH: u32 = 3;

/// A labeled rectangle in cropped-output pixel space.
///
/// No validation happens here: empty labels, negative coordinates and boxes
/// larger than the image are all carried through as drawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub label: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(label: impl Into<String>, left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            label: label.into(),
            left,
            top,
            width,
            height,
        }
    }

    /// Builds a box from absolute corners.
    pub fn from_corners(label: impl Into<String>, corners: BBoxXYXY<Pixel>) -> Self {
        Self::new(
            label,
            corners.xmin(),
            corners.ymin(),
            corners.width(),
            corners.height(),
        )
    }

    /// Absolute corner pair: `(left, top)` to `(left + width, top + height)`.
    pub fn corners(&self) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_xywh(self.left, self.top, self.width, self.height)
    }
}

/// Parses `label:left,top,width,height`. The label may itself contain `:`.
impl FromStr for BoundingBox {
    type Err = StreetboxError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (label, rect) = raw.rsplit_once(':').ok_or_else(|| {
            StreetboxError::InvalidArgument(format!(
                "expected 'label:left,top,width,height', got '{raw}'"
            ))
        })?;
        let values = parse_f64_list(rect, 4)?;
        Ok(Self::new(label, values[0], values[1], values[2], values[3]))
    }
}

/// The record exported next to a cropped image.
///
/// `width` and `height` are the true pixel dimensions of the exported image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDocument {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub objects: Vec<BoundingBox>,
}

impl AnnotationDocument {
    pub fn new(
        filename: impl Into<String>,
        width: u32,
        height: u32,
        objects: Vec<BoundingBox>,
    ) -> Self {
        Self {
            filename: filename.into(),
            width,
            height,
            objects,
        }
    }
}
