//! Export of a finished annotation session as a file pair.
//!
//! An export runs in three steps:
//!
//! 1. [`ExportCoordinator::begin`] checks the guards (annotate stage,
//!    non-empty entries, not yet exported) and snapshots what is needed.
//! 2. [`resolve_dimensions`] reads the true pixel size back out of the
//!    encoded JPEG. This is async; the pipeline may be reset meanwhile.
//! 3. [`ExportCoordinator::finish`] drops the result if the pipeline moved
//!    on, otherwise encodes the document and emits `<name>.xml` and
//!    `<name>.jpg` through the sink.
//!
//! [`ExportCoordinator::export`] runs all three in order.

mod naming;
mod sink;

pub use naming::{NamingStrategy, DEFAULT_PREFIX};
pub use sink::{ArtifactPair, ArtifactSink, DirectorySink, MemorySink, IMAGE_EXTENSION};

use std::fmt;
use std::sync::Arc;

use crate::annotation::voc::to_voc_xml_string;
use crate::annotation::{AnnotationDocument, BoundingBox};
use crate::error::StreetboxError;
use crate::location::ViewPosition;
use crate::pipeline::{Generation, Pipeline, PipelineState, Stage};
use crate::raster::CroppedRaster;

/// Why an export request did nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportSkip {
    NotAnnotating(Stage),
    NoEntries,
    AlreadyDownloaded,
}

impl fmt::Display for ExportSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportSkip::NotAnnotating(stage) => write!(f, "nothing to export during {stage}"),
            ExportSkip::NoEntries => f.write_str("no boxes drawn"),
            ExportSkip::AlreadyDownloaded => f.write_str("already exported this session"),
        }
    }
}

/// What an export request resulted in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Emitted(ExportSummary),
    Skipped(ExportSkip),
    /// The pipeline was reset while dimensions were being resolved.
    Stale,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportSummary {
    pub basename: String,
    pub width: u32,
    pub height: u32,
    pub objects: usize,
}

/// Snapshot taken when an export starts.
#[derive(Clone, Debug)]
pub struct ExportTicket {
    pub generation: Generation,
    pub basename: String,
    pub cropped: Arc<CroppedRaster>,
    pub entries: Vec<BoundingBox>,
}

/// Owns the export counter and the per-session `downloaded` flag.
#[derive(Debug)]
pub struct ExportCoordinator<S> {
    sink: S,
    naming: NamingStrategy,
    counter: u64,
    downloaded: bool,
    single_shot: bool,
}

impl<S: ArtifactSink> ExportCoordinator<S> {
    pub fn new(sink: S, naming: NamingStrategy) -> Self {
        Self {
            sink,
            naming,
            counter: 1,
            downloaded: false,
            single_shot: false,
        }
    }

    /// Clear the pipeline's entries after every successful export.
    pub fn with_single_shot(mut self, single_shot: bool) -> Self {
        self.single_shot = single_shot;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn naming(&self) -> &NamingStrategy {
        &self.naming
    }

    /// Number the next sequential export will carry.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn is_downloaded(&self) -> bool {
        self.downloaded
    }

    /// Allow one more export. Called when the pipeline resets.
    ///
    /// The counter keeps counting across sessions.
    pub fn begin_session(&mut self) {
        self.downloaded = false;
    }

    /// Check the guards and snapshot the export inputs.
    pub fn begin(
        &self,
        pipeline: &Pipeline,
        view: Option<&ViewPosition>,
    ) -> Result<ExportTicket, ExportSkip> {
        let PipelineState::Annotate {
            cropped, entries, ..
        } = pipeline.state()
        else {
            return Err(ExportSkip::NotAnnotating(pipeline.stage()));
        };
        if self.downloaded {
            return Err(ExportSkip::AlreadyDownloaded);
        }
        if entries.is_empty() {
            return Err(ExportSkip::NoEntries);
        }

        Ok(ExportTicket {
            generation: pipeline.generation(),
            basename: self.naming.basename(self.counter, view),
            cropped: Arc::clone(cropped),
            entries: entries.clone(),
        })
    }

    /// Encode and emit, unless the pipeline moved on since `begin`.
    pub fn finish(
        &mut self,
        ticket: ExportTicket,
        (width, height): (u32, u32),
        pipeline: &mut Pipeline,
    ) -> Result<ExportOutcome, StreetboxError> {
        if ticket.generation != pipeline.generation() {
            tracing::debug!(
                generation = %ticket.generation,
                current = %pipeline.generation(),
                "discarding stale export"
            );
            return Ok(ExportOutcome::Stale);
        }
        if self.downloaded {
            return Ok(ExportOutcome::Skipped(ExportSkip::AlreadyDownloaded));
        }

        let objects = ticket.entries.len();
        let document = AnnotationDocument::new(
            format!("{}.{}", ticket.basename, IMAGE_EXTENSION),
            width,
            height,
            ticket.entries,
        );
        let pair = ArtifactPair {
            basename: ticket.basename,
            annotation_xml: to_voc_xml_string(&document),
            image_jpeg: ticket.cropped.jpeg_bytes().to_vec(),
        };
        self.sink.emit(&pair)?;

        self.downloaded = true;
        self.counter += 1;
        if self.single_shot {
            if let Err(skip) = pipeline.clear_entries() {
                tracing::debug!(%skip, "entries not cleared after export");
            }
        }

        tracing::info!(basename = %pair.basename, width, height, objects, "exported");
        Ok(ExportOutcome::Emitted(ExportSummary {
            basename: pair.basename,
            width,
            height,
            objects,
        }))
    }

    /// Run a complete export.
    pub async fn export(
        &mut self,
        pipeline: &mut Pipeline,
        view: Option<&ViewPosition>,
    ) -> Result<ExportOutcome, StreetboxError> {
        let ticket = match self.begin(pipeline, view) {
            Ok(ticket) => ticket,
            Err(skip) => {
                tracing::debug!(%skip, "export skipped");
                return Ok(ExportOutcome::Skipped(skip));
            }
        };
        let dimensions = resolve_dimensions(Arc::clone(&ticket.cropped)).await?;
        self.finish(ticket, dimensions, pipeline)
    }
}

/// Read the true pixel dimensions from the encoded image.
///
/// Runs the header decode on the blocking pool.
pub async fn resolve_dimensions(cropped: Arc<CroppedRaster>) -> Result<(u32, u32), StreetboxError> {
    let size = tokio::task::spawn_blocking(move || imagesize::blob_size(cropped.jpeg_bytes()))
        .await?
        .map_err(|err| StreetboxError::DimensionResolve(err.to_string()))?;

    let width = u32::try_from(size.width)
        .map_err(|_| StreetboxError::DimensionResolve(format!("width {} too large", size.width)))?;
    let height = u32::try_from(size.height).map_err(|_| {
        StreetboxError::DimensionResolve(format!("height {} too large", size.height))
    })?;
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{CoordinateTransformer, CropRegion, Raster};
    use image::{Rgba, RgbaImage};

    fn annotating(entries: Vec<BoundingBox>) -> Pipeline {
        let mut pipeline = Pipeline::new();
        pipeline
            .commit_capture(Raster::new(RgbaImage::from_pixel(
                40,
                30,
                Rgba([10, 200, 30, 255]),
            )))
            .expect("capture");
        let ticket = pipeline
            .commit_crop(CropRegion::new(0.0, 0.0, 20.0, 10.0))
            .expect("crop");
        let cropped = CoordinateTransformer::default()
            .transform(&ticket.source, &ticket.crop)
            .expect("transform");
        pipeline.complete_crop(ticket.generation, cropped);
        pipeline.replace_entries(entries).expect("annotating");
        pipeline
    }

    fn pole() -> BoundingBox {
        BoundingBox::new("pole", 1.0, 2.0, 3.0, 4.0)
    }

    #[tokio::test]
    async fn export_emits_one_pair_with_true_dimensions() {
        let mut pipeline = annotating(vec![pole()]);
        let mut exporter = ExportCoordinator::new(MemorySink::default(), NamingStrategy::default());

        let outcome = exporter.export(&mut pipeline, None).await.expect("export");
        assert_eq!(
            outcome,
            ExportOutcome::Emitted(ExportSummary {
                basename: "annotate_1".to_string(),
                width: 20,
                height: 10,
                objects: 1,
            })
        );

        let emitted = &exporter.sink().emitted;
        assert_eq!(emitted.len(), 1);
        assert!(emitted[0]
            .annotation_xml
            .contains("<filename>annotate_1.jpg</filename>"));
        assert!(emitted[0].annotation_xml.contains("<width>20</width>"));
        assert!(exporter.is_downloaded());
        assert_eq!(exporter.counter(), 2);
    }

    #[tokio::test]
    async fn second_export_is_a_no_op() {
        let mut pipeline = annotating(vec![pole()]);
        let mut exporter = ExportCoordinator::new(MemorySink::default(), NamingStrategy::default());

        exporter.export(&mut pipeline, None).await.expect("first");
        let second = exporter.export(&mut pipeline, None).await.expect("second");

        assert_eq!(
            second,
            ExportOutcome::Skipped(ExportSkip::AlreadyDownloaded)
        );
        assert_eq!(exporter.sink().emitted.len(), 1);
        assert_eq!(exporter.counter(), 2);
    }

    #[tokio::test]
    async fn empty_entries_skip_export() {
        let mut pipeline = annotating(vec![]);
        let mut exporter = ExportCoordinator::new(MemorySink::default(), NamingStrategy::default());

        let outcome = exporter.export(&mut pipeline, None).await.expect("export");
        assert_eq!(outcome, ExportOutcome::Skipped(ExportSkip::NoEntries));
        assert!(exporter.sink().emitted.is_empty());
        assert!(!exporter.is_downloaded());
    }

    #[tokio::test]
    async fn export_outside_annotate_is_skipped() {
        let mut pipeline = Pipeline::new();
        let mut exporter = ExportCoordinator::new(MemorySink::default(), NamingStrategy::default());

        let outcome = exporter.export(&mut pipeline, None).await.expect("export");
        assert_eq!(
            outcome,
            ExportOutcome::Skipped(ExportSkip::NotAnnotating(Stage::Capture))
        );
    }

    #[tokio::test]
    async fn reset_during_resolution_discards_export() {
        let mut pipeline = annotating(vec![pole()]);
        let mut exporter = ExportCoordinator::new(MemorySink::default(), NamingStrategy::default());

        let ticket = exporter.begin(&pipeline, None).expect("begin");
        let dimensions = resolve_dimensions(Arc::clone(&ticket.cropped))
            .await
            .expect("resolve");
        pipeline.reset();

        let outcome = exporter
            .finish(ticket, dimensions, &mut pipeline)
            .expect("finish");
        assert_eq!(outcome, ExportOutcome::Stale);
        assert!(exporter.sink().emitted.is_empty());
        assert!(!exporter.is_downloaded());
        assert_eq!(exporter.counter(), 1);
    }

    #[tokio::test]
    async fn single_shot_clears_entries_after_export() {
        let mut pipeline = annotating(vec![pole(), pole()]);
        let mut exporter = ExportCoordinator::new(MemorySink::default(), NamingStrategy::default())
            .with_single_shot(true);

        exporter.export(&mut pipeline, None).await.expect("export");
        assert_eq!(pipeline.entries().map(<[_]>::len), Some(0));
    }

    #[tokio::test]
    async fn new_session_allows_another_export_with_next_number() {
        let mut exporter = ExportCoordinator::new(MemorySink::default(), NamingStrategy::default());

        let mut pipeline = annotating(vec![pole()]);
        exporter.export(&mut pipeline, None).await.expect("first");

        exporter.begin_session();
        let mut pipeline = annotating(vec![pole()]);
        let outcome = exporter.export(&mut pipeline, None).await.expect("second");

        let ExportOutcome::Emitted(summary) = &outcome else {
            panic!("expected emission, got {outcome:?}");
        };
        assert_eq!(summary.basename, "annotate_2");
        assert_eq!(exporter.sink().emitted.len(), 2);
    }

    #[tokio::test]
    async fn resolve_rejects_non_image_bytes() {
        let cropped = Arc::new(CroppedRaster::new(b"not an image".to_vec(), 1, 1));
        let err = resolve_dimensions(cropped).await.expect_err("garbage bytes");
        assert!(matches!(err, StreetboxError::DimensionResolve(_)));
    }
}
