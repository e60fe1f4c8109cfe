//! Pipeline stages and the data each one owns.

use std::fmt;
use std::sync::Arc;

use crate::annotation::BoundingBox;
use crate::raster::{CommittedCrop, CroppedRaster, Raster};

/// Tag for async work, bumped by every committed crop and every reset.
///
/// A result is only applied while the pipeline still carries the generation
/// it was started under.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub(crate) u64);

impl Generation {
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Generation({})", self.0)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which UI is active. Data-free mirror of [`PipelineState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Capture,
    Crop,
    Annotate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Capture => "capture",
            Stage::Crop => "crop",
            Stage::Annotate => "annotate",
        };
        f.write_str(name)
    }
}

/// The current stage together with the only data valid in it.
#[derive(Clone, Debug, Default)]
pub enum PipelineState {
    /// Waiting for a surface capture.
    #[default]
    Capture,
    /// A source raster exists; the operator is selecting a region.
    Crop {
        source: Arc<Raster>,
        committed: Option<CommittedCrop>,
    },
    /// The cropped raster is ready and boxes are being drawn over it.
    Annotate {
        source: Arc<Raster>,
        committed: CommittedCrop,
        cropped: Arc<CroppedRaster>,
        entries: Vec<BoundingBox>,
    },
}

impl PipelineState {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineState::Capture => Stage::Capture,
            PipelineState::Crop { .. } => Stage::Crop,
            PipelineState::Annotate { .. } => Stage::Annotate,
        }
    }
}
