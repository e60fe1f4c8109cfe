//! Typed geometry shared by the crop and annotation stages.
//!
//! Two coordinate spaces exist in the pipeline: the *display* space the
//! operator drags a crop rectangle in, and the *pixel* space of the raster
//! buffers. Marker types keep them apart; the only way across is an explicit
//! [`ScaleFactors`] conversion.
//!
//! ```
//! use streetbox::geometry::{BBoxXYXY, Display, ScaleFactors};
//!
//! let shown: BBoxXYXY<Display> = BBoxXYXY::from_xywh(0.0, 0.0, 100.0, 50.0);
//! let factors = ScaleFactors::between((800, 600), (400.0, 300.0));
//! let pixels = shown.to_pixel(factors);
//! assert_eq!(pixels.width(), 200.0);
//! ```

mod bbox;
mod coord;
mod space;

pub use bbox::BBoxXYXY;
pub use coord::{Coord, ScaleFactors};
pub use space::{Display, Pixel};
