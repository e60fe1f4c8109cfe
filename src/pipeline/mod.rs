//! The capture → crop → annotate state machine.
//!
//! [`Pipeline`] is the single source of truth for which stage is active and
//! which data is valid. Every mutation goes through a transition method;
//! transitions that do not apply in the current stage are reported as a
//! [`Skip`] and change nothing.
//!
//! Async work (the debounced crop transform, export dimension resolution)
//! is tagged with the [`Generation`] it started under. The generation moves
//! forward on every committed crop and every reset, so a result that
//! arrives late is recognised as stale and dropped.

pub mod debounce;
mod state;

pub use debounce::{Debouncer, DEFAULT_DEBOUNCE};
pub use state::{Generation, PipelineState, Stage};

use std::fmt;
use std::sync::Arc;

use crate::annotation::BoundingBox;
use crate::raster::{CommittedCrop, CropRegion, CroppedRaster, Raster};

/// Why a transition did not happen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Skip {
    /// The transition belongs to another stage.
    WrongStage { expected: Stage, actual: Stage },
    /// Zero-area crop, or nothing to export.
    EmptySelection,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skip::WrongStage { expected, actual } => {
                write!(f, "only valid during {expected} (currently {actual})")
            }
            Skip::EmptySelection => f.write_str("empty selection"),
        }
    }
}

/// Everything the crop transform needs, frozen at commit time.
#[derive(Clone, Debug)]
pub struct CropTicket {
    pub generation: Generation,
    pub source: Arc<Raster>,
    pub crop: CommittedCrop,
}

/// What happened to a finished crop transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The pipeline moved to [`Stage::Annotate`].
    Applied,
    /// The transform produced no pixels; the pipeline stays in crop.
    Empty,
    /// The result belonged to a superseded crop or a reset session.
    Stale,
}

/// One operator session's pipeline.
#[derive(Debug, Default)]
pub struct Pipeline {
    state: PipelineState,
    generation: Generation,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Capture → Crop with a freshly rendered source raster.
    pub fn commit_capture(&mut self, source: Raster) -> Result<(), Skip> {
        self.expect_stage(Stage::Capture)?;
        tracing::debug!(
            width = source.natural_width(),
            height = source.natural_height(),
            "capture committed"
        );
        self.state = PipelineState::Crop {
            source: Arc::new(source),
            committed: None,
        };
        Ok(())
    }

    /// Freeze a crop selection and hand out the work needed to transform it.
    ///
    /// Bumps the generation, which invalidates any transform still in flight
    /// for an earlier selection.
    pub fn commit_crop(&mut self, region: CropRegion) -> Result<CropTicket, Skip> {
        let PipelineState::Crop { source, committed } = &mut self.state else {
            return Err(self.wrong_stage(Stage::Crop));
        };
        if !region.has_area() {
            return Err(Skip::EmptySelection);
        }

        let crop = region.commit();
        *committed = Some(crop);
        self.generation = self.generation.next();

        Ok(CropTicket {
            generation: self.generation,
            source: Arc::clone(source),
            crop,
        })
    }

    /// Crop → Annotate, if `generation` is still current.
    pub fn complete_crop(&mut self, generation: Generation, cropped: CroppedRaster) -> Completion {
        if generation != self.generation {
            tracing::debug!(%generation, current = %self.generation, "discarding stale crop result");
            return Completion::Stale;
        }
        let PipelineState::Crop {
            source,
            committed: Some(committed),
        } = &self.state
        else {
            tracing::debug!(%generation, stage = %self.stage(), "discarding crop result outside crop stage");
            return Completion::Stale;
        };
        if cropped.is_empty() {
            return Completion::Empty;
        }

        tracing::debug!(
            width = cropped.buffer_width(),
            height = cropped.buffer_height(),
            "crop applied, annotating"
        );
        self.state = PipelineState::Annotate {
            source: Arc::clone(source),
            committed: *committed,
            cropped: Arc::new(cropped),
            entries: Vec::new(),
        };
        Completion::Applied
    }

    /// Boxes drawn so far, in creation order. `None` outside annotate.
    pub fn entries(&self) -> Option<&[BoundingBox]> {
        match &self.state {
            PipelineState::Annotate { entries, .. } => Some(entries),
            _ => None,
        }
    }

    pub fn cropped(&self) -> Option<&Arc<CroppedRaster>> {
        match &self.state {
            PipelineState::Annotate { cropped, .. } => Some(cropped),
            _ => None,
        }
    }

    pub fn push_entry(&mut self, entry: BoundingBox) -> Result<(), Skip> {
        self.entries_mut()?.push(entry);
        Ok(())
    }

    /// Replace the whole entry list, as an annotator widget reports it.
    pub fn replace_entries(&mut self, replacement: Vec<BoundingBox>) -> Result<(), Skip> {
        *self.entries_mut()? = replacement;
        Ok(())
    }

    pub fn clear_entries(&mut self) -> Result<(), Skip> {
        self.entries_mut()?.clear();
        Ok(())
    }

    /// Back to capture from any stage, dropping all stage data.
    pub fn reset(&mut self) {
        self.generation = self.generation.next();
        if self.stage() != Stage::Capture {
            tracing::debug!(from = %self.stage(), "pipeline reset");
        }
        self.state = PipelineState::Capture;
    }

    fn entries_mut(&mut self) -> Result<&mut Vec<BoundingBox>, Skip> {
        let actual = self.stage();
        match &mut self.state {
            PipelineState::Annotate { entries, .. } => Ok(entries),
            _ => Err(Skip::WrongStage {
                expected: Stage::Annotate,
                actual,
            }),
        }
    }

    fn expect_stage(&self, expected: Stage) -> Result<(), Skip> {
        if self.stage() == expected {
            Ok(())
        } else {
            Err(self.wrong_stage(expected))
        }
    }

    fn wrong_stage(&self, expected: Stage) -> Skip {
        Skip::WrongStage {
            expected,
            actual: self.stage(),
        }
    }
}
