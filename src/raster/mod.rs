//! Raster buffers moving through the pipeline.
//!
//! A [`Raster`] is what the capture stage produces: a true-resolution RGBA
//! buffer plus the size it was shown at on screen. A [`CroppedRaster`] is what
//! the crop stage produces: JPEG bytes cut out of a source raster by the
//! [`CoordinateTransformer`].

pub(crate) mod crop;
pub mod transform;

pub use crop::{CommittedCrop, CropRegion};
pub use transform::CoordinateTransformer;

use image::RgbaImage;

use crate::error::StreetboxError;
use crate::geometry::ScaleFactors;

/// A captured bitmap with both true and displayed dimensions.
///
/// Immutable once captured; the pipeline shares it behind an `Arc`.
#[derive(Clone, Debug)]
pub struct Raster {
    pixels: RgbaImage,
    display_width: f64,
    display_height: f64,
}

impl Raster {
    /// Wraps a buffer that is displayed at its natural size.
    pub fn new(pixels: RgbaImage) -> Self {
        let (width, height) = pixels.dimensions();
        Self {
            pixels,
            display_width: f64::from(width),
            display_height: f64::from(height),
        }
    }

    /// Wraps a buffer that is displayed at `width` x `height` on screen.
    pub fn with_display_size(
        pixels: RgbaImage,
        width: f64,
        height: f64,
    ) -> Result<Self, StreetboxError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            return Err(StreetboxError::InvalidDisplaySize { width, height });
        }
        Ok(Self {
            pixels,
            display_width: width,
            display_height: height,
        })
    }

    pub fn natural_width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn natural_height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn display_width(&self) -> f64 {
        self.display_width
    }

    pub fn display_height(&self) -> f64 {
        self.display_height
    }

    /// Ratio between the true pixel size and the displayed size.
    pub fn scale_factors(&self) -> ScaleFactors {
        ScaleFactors::between(
            self.pixels.dimensions(),
            (self.display_width, self.display_height),
        )
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// The output of the crop stage: an encoded JPEG and its buffer size.
///
/// The buffer size is what the transformer allocated. Export does not trust
/// it and re-reads the dimensions from the encoded bytes instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CroppedRaster {
    jpeg: Vec<u8>,
    width: u32,
    height: u32,
}

impl CroppedRaster {
    pub(crate) fn new(jpeg: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            jpeg,
            width,
            height,
        }
    }

    /// A zero-area result with no encoded bytes.
    pub(crate) fn empty(width: u32, height: u32) -> Self {
        Self::new(Vec::new(), width, height)
    }

    pub fn jpeg_bytes(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn buffer_width(&self) -> u32 {
        self.width
    }

    pub fn buffer_height(&self) -> u32 {
        self.height
    }

    /// True when the output buffer has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
