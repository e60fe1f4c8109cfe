//! Display-space crop to pixel-exact raster.
//!
//! The crop rectangle is chosen on a possibly scaled view of the source, so
//! it first has to be mapped onto the source's true pixel grid. The output
//! buffer is additionally multiplied by a device pixel ratio for sharpness.
//!
//! Drawing happens through one composed affine transform, built in this
//! order:
//!
//! 1. scale by the pixel ratio,
//! 2. translate the crop's top-left (in pixel space) to the output origin,
//! 3. translate to the image center,
//! 4. rotate,
//! 5. scale by the crop zoom,
//! 6. translate back from the image center.
//!
//! The whole source is then drawn once; anything outside the output buffer is
//! clipped by its bounds.

use image::codecs::jpeg::JpegEncoder;
use image::{RgbImage, RgbaImage};
use tiny_skia::{ColorU8, FilterQuality, Pixmap, PixmapPaint, Transform};

use super::{CommittedCrop, CroppedRaster, Raster};
use crate::error::StreetboxError;

/// Highest JPEG quality the encoder accepts.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Largest output side the JPEG encoder can write.
pub const MAX_OUTPUT_SIDE: u32 = u16::MAX as u32;

/// Turns committed crops into cropped rasters.
#[derive(Clone, Copy, Debug)]
pub struct CoordinateTransformer {
    pixel_ratio: f64,
    quality: u8,
}

impl Default for CoordinateTransformer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl CoordinateTransformer {
    /// Creates a transformer for the given device pixel ratio.
    ///
    /// Ratios below 1 (or non-finite) are clamped to 1.
    pub fn new(pixel_ratio: f64) -> Self {
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio >= 1.0 {
            pixel_ratio
        } else {
            1.0
        };
        Self {
            pixel_ratio,
            quality: MAX_JPEG_QUALITY,
        }
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Output buffer size for `crop` over `source`.
    ///
    /// `floor(crop.width * scale_x * pixel_ratio)` by
    /// `floor(crop.height * scale_y * pixel_ratio)`; anything negative or NaN
    /// becomes 0.
    pub fn output_size(&self, source: &Raster, crop: &CommittedCrop) -> (u32, u32) {
        let factors = source.scale_factors();
        let region = crop.region();
        (
            floor_dimension(region.width * factors.x * self.pixel_ratio),
            floor_dimension(region.height * factors.y * self.pixel_ratio),
        )
    }

    /// Draws the cropped region into an RGB buffer.
    ///
    /// A zero-area output is returned as an empty buffer without touching
    /// any drawing surface. Outputs wider or taller than
    /// [`MAX_OUTPUT_SIDE`] are refused before anything is allocated.
    pub fn rasterize(
        &self,
        source: &Raster,
        crop: &CommittedCrop,
    ) -> Result<RgbImage, StreetboxError> {
        let (width, height) = self.output_size(source, crop);
        if width == 0 || height == 0 {
            return Ok(RgbImage::new(width, height));
        }
        if width > MAX_OUTPUT_SIDE || height > MAX_OUTPUT_SIDE {
            return Err(StreetboxError::RenderContextUnavailable { width, height });
        }

        let mut output = Pixmap::new(width, height)
            .ok_or(StreetboxError::RenderContextUnavailable { width, height })?;
        let source_pixmap = premultiplied_pixmap(source.pixels())?;

        let paint = PixmapPaint {
            quality: FilterQuality::Bicubic,
            ..PixmapPaint::default()
        };
        output.draw_pixmap(
            0,
            0,
            source_pixmap.as_ref(),
            &paint,
            self.composite_transform(source, crop),
            None,
        );

        flatten_to_rgb(&output)
    }

    /// Crops `source` and encodes the result as a maximum-quality JPEG.
    pub fn transform(
        &self,
        source: &Raster,
        crop: &CommittedCrop,
    ) -> Result<CroppedRaster, StreetboxError> {
        let rgb = self.rasterize(source, crop)?;
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Ok(CroppedRaster::empty(width, height));
        }

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .encode_image(&rgb)
            .map_err(StreetboxError::ImageEncode)?;

        tracing::debug!(width, height, bytes = jpeg.len(), "encoded cropped raster");
        Ok(CroppedRaster::new(jpeg, width, height))
    }

    fn composite_transform(&self, source: &Raster, crop: &CommittedCrop) -> Transform {
        let region = crop.region();
        let origin = crop.bounds().to_pixel(source.scale_factors()).min;

        let pixel_ratio = self.pixel_ratio as f32;
        let crop_x = origin.x as f32;
        let crop_y = origin.y as f32;
        let center_x = source.natural_width() as f32 / 2.0;
        let center_y = source.natural_height() as f32 / 2.0;
        let zoom = region.scale as f32;

        let (sin, cos) = region.rotate.to_radians().sin_cos();
        let rotation = Transform::from_row(cos as f32, sin as f32, -sin as f32, cos as f32, 0.0, 0.0);

        Transform::from_scale(pixel_ratio, pixel_ratio)
            .pre_translate(-crop_x, -crop_y)
            .pre_translate(center_x, center_y)
            .pre_concat(rotation)
            .pre_scale(zoom, zoom)
            .pre_translate(-center_x, -center_y)
    }
}

fn floor_dimension(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        // Saturates at u32::MAX.
        value.floor() as u32
    }
}

fn premultiplied_pixmap(image: &RgbaImage) -> Result<Pixmap, StreetboxError> {
    let (width, height) = image.dimensions();
    let mut pixmap = Pixmap::new(width, height)
        .ok_or(StreetboxError::RenderContextUnavailable { width, height })?;

    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Drops alpha; uncovered (transparent) pixels come out black.
fn flatten_to_rgb(pixmap: &Pixmap) -> Result<RgbImage, StreetboxError> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let mut raw = Vec::with_capacity(width as usize * height as usize * 3);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        raw.extend_from_slice(&[color.red(), color.green(), color.blue()]);
    }
    RgbImage::from_raw(width, height, raw)
        .ok_or(StreetboxError::RenderContextUnavailable { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::CropRegion;
    use image::Rgba;

    fn assert_near(actual: [u8; 3], expected: [u8; 3]) {
        let close = actual
            .iter()
            .zip(expected.iter())
            .all(|(a, e)| a.abs_diff(*e) <= 8);
        assert!(close, "pixel {actual:?} not near {expected:?}");
    }

    /// Left half red, right half blue.
    fn split_raster(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        })
    }

    #[test]
    fn output_size_accounts_for_display_scaling() {
        let source = Raster::with_display_size(RgbaImage::new(800, 600), 400.0, 300.0)
            .expect("valid display size");
        let crop = CropRegion::new(0.0, 0.0, 100.0, 50.0).commit();

        let transformer = CoordinateTransformer::new(1.0);
        assert_eq!(transformer.output_size(&source, &crop), (200, 100));

        let retina = CoordinateTransformer::new(2.0);
        assert_eq!(retina.output_size(&source, &crop), (400, 200));

        let stretched = Raster::with_display_size(RgbaImage::new(800, 600), 400.0, 600.0)
            .expect("valid display size");
        assert_eq!(transformer.output_size(&stretched, &crop), (200, 50));
    }

    #[test]
    fn output_size_floors_fractional_pixels() {
        let source = Raster::with_display_size(RgbaImage::new(100, 100), 30.0, 30.0)
            .expect("valid display size");
        let crop = CropRegion::new(0.0, 0.0, 10.0, 10.0).commit();
        // 10 * (100 / 30) = 33.33..
        assert_eq!(
            CoordinateTransformer::default().output_size(&source, &crop),
            (33, 33)
        );
    }

    #[test]
    fn oversized_output_is_refused_without_allocating() {
        let source = Raster::new(split_raster(4, 4));
        let crop = CropRegion::new(0.0, 0.0, 60_000.0, 60_000.0).commit();
        let transformer = CoordinateTransformer::new(2.0);
        assert_eq!(transformer.output_size(&source, &crop), (120_000, 120_000));

        let err = transformer
            .transform(&source, &crop)
            .expect_err("output too large for a JPEG");
        assert!(matches!(
            err,
            StreetboxError::RenderContextUnavailable {
                width: 120_000,
                height: 120_000
            }
        ));
    }

    #[test]
    fn one_oversized_side_is_enough_to_refuse() {
        let source = Raster::new(split_raster(4, 4));
        let crop = CropRegion::new(0.0, 0.0, f64::from(MAX_OUTPUT_SIDE) + 1.0, 1.0).commit();

        let result = CoordinateTransformer::default().rasterize(&source, &crop);
        assert!(matches!(
            result,
            Err(StreetboxError::RenderContextUnavailable { .. })
        ));
    }

    #[test]
    fn pixel_ratio_below_one_is_clamped() {
        assert_eq!(CoordinateTransformer::new(0.5).pixel_ratio(), 1.0);
        assert_eq!(CoordinateTransformer::new(f64::NAN).pixel_ratio(), 1.0);
        assert_eq!(CoordinateTransformer::new(1.5).pixel_ratio(), 1.5);
    }

    #[test]
    fn zero_area_crop_yields_empty_output() {
        let source = Raster::new(split_raster(20, 20));
        let crop = CropRegion::new(4.0, 4.0, 0.0, 10.0).commit();

        let cropped = CoordinateTransformer::default()
            .transform(&source, &crop)
            .expect("zero-area crop is not an error");
        assert!(cropped.is_empty());
        assert!(cropped.jpeg_bytes().is_empty());
        assert_eq!(cropped.buffer_width(), 0);
        assert_eq!(cropped.buffer_height(), 10);
    }

    #[test]
    fn rasterize_takes_pixels_from_crop_window() {
        let source = Raster::new(split_raster(20, 10));
        let transformer = CoordinateTransformer::default();

        let left = transformer
            .rasterize(&source, &CropRegion::new(0.0, 0.0, 8.0, 10.0).commit())
            .expect("rasterize left");
        assert_eq!(left.dimensions(), (8, 10));
        assert_near(left.get_pixel(4, 5).0, [255, 0, 0]);

        let right = transformer
            .rasterize(&source, &CropRegion::new(12.0, 0.0, 8.0, 10.0).commit())
            .expect("rasterize right");
        assert_near(right.get_pixel(4, 5).0, [0, 0, 255]);
    }

    #[test]
    fn rasterize_maps_display_offset_to_pixels() {
        // Shown at half size: display x=6 is pixel x=12, inside the blue half.
        let source = Raster::with_display_size(split_raster(20, 10), 10.0, 5.0)
            .expect("valid display size");
        let crop = CropRegion::new(6.0, 0.0, 4.0, 5.0).commit();

        let out = CoordinateTransformer::default()
            .rasterize(&source, &crop)
            .expect("rasterize");
        assert_eq!(out.dimensions(), (8, 10));
        assert_near(out.get_pixel(4, 5).0, [0, 0, 255]);
    }

    #[test]
    fn half_turn_rotation_swaps_halves() {
        let source = Raster::new(split_raster(20, 10));
        let crop = CropRegion::new(0.0, 0.0, 8.0, 10.0)
            .with_rotation(180.0)
            .commit();

        let out = CoordinateTransformer::default()
            .rasterize(&source, &crop)
            .expect("rasterize rotated");
        assert_near(out.get_pixel(4, 5).0, [0, 0, 255]);
    }

    #[test]
    fn crop_outside_source_is_black() {
        let source = Raster::new(split_raster(10, 10));
        let crop = CropRegion::new(50.0, 50.0, 4.0, 4.0).commit();

        let out = CoordinateTransformer::default()
            .rasterize(&source, &crop)
            .expect("rasterize outside");
        assert_eq!(out.dimensions(), (4, 4));
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn transform_encodes_jpeg_with_buffer_dimensions() {
        let source = Raster::new(split_raster(40, 30));
        let crop = CropRegion::new(5.0, 5.0, 16.0, 12.0).commit();

        let cropped = CoordinateTransformer::new(2.0)
            .transform(&source, &crop)
            .expect("transform");
        assert_eq!((cropped.buffer_width(), cropped.buffer_height()), (32, 24));

        let size = imagesize::blob_size(cropped.jpeg_bytes()).expect("jpeg header");
        assert_eq!((size.width, size.height), (32, 24));
    }

    #[test]
    fn transform_leaves_source_untouched() {
        let pixels = split_raster(20, 10);
        let source = Raster::new(pixels.clone());
        let crop = CropRegion::new(2.0, 2.0, 6.0, 6.0).with_scale(2.0).commit();

        CoordinateTransformer::default()
            .transform(&source, &crop)
            .expect("transform");
        assert_eq!(source.pixels(), &pixels);
    }
}
