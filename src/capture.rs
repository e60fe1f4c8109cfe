//! Capture surfaces.
//!
//! The map/street-view widget is an external collaborator; all the pipeline
//! needs from it is something that renders to a [`Raster`] on request.

use std::path::PathBuf;

use crate::error::StreetboxError;
use crate::raster::Raster;

/// Something that can be rendered into a raster.
///
/// Rendering may take a while (a browser screenshot, a file decode), so it is
/// async. A failed render is reported as an error; callers do not retry.
#[allow(async_fn_in_trait)]
pub trait Surface {
    async fn capture(&mut self) -> Result<Raster, StreetboxError>;
}

/// Renders an image file from disk.
#[derive(Clone, Debug)]
pub struct ImageFileSurface {
    path: PathBuf,
    display_size: Option<(f64, f64)>,
}

impl ImageFileSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            display_size: None,
        }
    }

    /// Pretend the image is shown at `width` x `height` on screen.
    pub fn with_display_size(mut self, width: f64, height: f64) -> Self {
        self.display_size = Some((width, height));
        self
    }
}

impl Surface for ImageFileSurface {
    async fn capture(&mut self) -> Result<Raster, StreetboxError> {
        let path = self.path.clone();
        let decoded = tokio::task::spawn_blocking(move || {
            image::open(&path).map_err(|source| StreetboxError::ImageDecode { path, source })
        })
        .await??;

        let pixels = decoded.to_rgba8();
        tracing::debug!(
            path = %self.path.display(),
            width = pixels.width(),
            height = pixels.height(),
            "surface rendered"
        );
        match self.display_size {
            Some((width, height)) => Raster::with_display_size(pixels, width, height),
            None => Ok(Raster::new(pixels)),
        }
    }
}

/// Hands out clones of a raster that is already in memory.
#[derive(Clone, Debug)]
pub struct StaticSurface {
    raster: Raster,
}

impl StaticSurface {
    pub fn new(raster: Raster) -> Self {
        Self { raster }
    }
}

impl Surface for StaticSurface {
    async fn capture(&mut self) -> Result<Raster, StreetboxError> {
        Ok(self.raster.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[tokio::test]
    async fn file_surface_decodes_png() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("surface.png");
        RgbaImage::from_pixel(6, 4, Rgba([1, 2, 3, 255]))
            .save(&path)
            .expect("write png");

        let raster = ImageFileSurface::new(&path)
            .with_display_size(3.0, 2.0)
            .capture()
            .await
            .expect("capture");
        assert_eq!(raster.natural_width(), 6);
        assert_eq!(raster.natural_height(), 4);
        assert_eq!(raster.scale_factors().x, 2.0);
    }

    #[tokio::test]
    async fn file_surface_reports_missing_file() {
        let err = ImageFileSurface::new("does/not/exist.png")
            .capture()
            .await
            .expect_err("missing file");
        assert!(matches!(err, StreetboxError::ImageDecode { .. }));
    }
}
