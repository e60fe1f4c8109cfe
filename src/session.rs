//! One operator session: a pipeline wired to its collaborators.
//!
//! The session owns the capture surface, the debounced crop transform and
//! the export coordinator, and routes operator commands to them. All
//! mutations of the pipeline happen here, on the caller's task; the only
//! work that leaves it is the debounced transform and the export dimension
//! lookup, both of which are checked against the pipeline generation before
//! their results are applied.

use crate::annotation::BoundingBox;
use crate::capture::Surface;
use crate::config::Config;
use crate::error::StreetboxError;
use crate::export::{ArtifactSink, ExportCoordinator, ExportOutcome};
use crate::keys::Command;
use crate::location::{CoordinateCursor, LatLng, ViewPosition};
use crate::pipeline::{Completion, Debouncer, Pipeline, Skip, Stage};
use crate::raster::{CoordinateTransformer, CropRegion, CroppedRaster};

type TransformResult = Result<CroppedRaster, StreetboxError>;

pub struct Session<S, K> {
    pipeline: Pipeline,
    surface: S,
    transformer: CoordinateTransformer,
    debouncer: Debouncer<TransformResult>,
    exporter: ExportCoordinator<K>,
    config: Config,
    view: Option<ViewPosition>,
    coordinates: CoordinateCursor,
    coordinate_list_visible: bool,
}

impl<S: Surface, K: ArtifactSink> Session<S, K> {
    pub fn new(surface: S, sink: K, config: &Config) -> Self {
        Self {
            pipeline: Pipeline::new(),
            surface,
            transformer: CoordinateTransformer::new(config.pixel_ratio),
            debouncer: Debouncer::new(config.debounce()),
            exporter: ExportCoordinator::new(sink, config.naming.clone())
                .with_single_shot(config.single_shot),
            config: config.clone(),
            view: None,
            coordinates: CoordinateCursor::default(),
            coordinate_list_visible: false,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn stage(&self) -> Stage {
        self.pipeline.stage()
    }

    pub fn exporter(&self) -> &ExportCoordinator<K> {
        &self.exporter
    }

    pub fn labels(&self) -> &[String] {
        &self.config.labels
    }

    /// Whether `label` is in the configured vocabulary. Unknown labels are
    /// still accepted.
    pub fn is_known_label(&self, label: &str) -> bool {
        self.config.is_known_label(label)
    }

    pub fn view(&self) -> Option<&ViewPosition> {
        self.view.as_ref()
    }

    /// Record where the map collaborator is currently looking.
    pub fn set_view(&mut self, view: ViewPosition) {
        self.view = Some(view);
    }

    pub fn coordinates(&self) -> &CoordinateCursor {
        &self.coordinates
    }

    pub fn is_coordinate_list_visible(&self) -> bool {
        self.coordinate_list_visible
    }

    /// Render the surface and enter the crop stage.
    ///
    /// Returns `Ok(false)` when not in the capture stage. A failed render
    /// leaves the pipeline in capture.
    pub async fn capture(&mut self) -> Result<bool, StreetboxError> {
        if self.pipeline.stage() != Stage::Capture {
            tracing::debug!(stage = %self.pipeline.stage(), "capture ignored");
            return Ok(false);
        }

        let raster = match self.surface.capture().await {
            Ok(raster) => raster,
            Err(err) => {
                tracing::warn!(error = %err, "capture failed");
                return Err(err);
            }
        };

        if self.pipeline.commit_capture(raster).is_err() {
            return Ok(false);
        }
        self.exporter.begin_session();
        Ok(true)
    }

    /// Commit a crop selection and schedule its transform.
    ///
    /// Any transform still pending for an earlier selection is cancelled.
    pub fn adjust_crop(&mut self, region: CropRegion) -> Result<(), Skip> {
        let ticket = self.pipeline.commit_crop(region)?;
        let transformer = self.transformer;
        self.debouncer.schedule(ticket.generation, move || {
            transformer.transform(&ticket.source, &ticket.crop)
        });
        Ok(())
    }

    /// Wait for the pending crop transform and apply it if still current.
    ///
    /// Returns `None` when nothing was pending. Transform errors are only
    /// reported for the current generation.
    pub async fn settle(&mut self) -> Result<Option<Completion>, StreetboxError> {
        let Some((generation, result)) = self.debouncer.wait().await else {
            return Ok(None);
        };
        match result {
            Ok(cropped) => Ok(Some(self.pipeline.complete_crop(generation, cropped))),
            Err(err) if generation == self.pipeline.generation() => Err(err),
            Err(err) => {
                tracing::debug!(%generation, error = %err, "discarding stale transform error");
                Ok(Some(Completion::Stale))
            }
        }
    }

    /// Append a drawn box.
    pub fn add_box(&mut self, entry: BoundingBox) -> Result<(), Skip> {
        self.warn_on_unknown_label(&entry);
        self.pipeline.push_entry(entry)
    }

    /// Replace all boxes with what the annotator reports.
    pub fn set_boxes(&mut self, entries: Vec<BoundingBox>) -> Result<(), Skip> {
        for entry in &entries {
            self.warn_on_unknown_label(entry);
        }
        self.pipeline.replace_entries(entries)
    }

    /// Drop everything and return to capture.
    pub fn reset(&mut self) {
        if self.debouncer.cancel() {
            tracing::debug!("cancelled pending crop transform");
        }
        self.pipeline.reset();
        self.exporter.begin_session();
    }

    pub async fn export(&mut self) -> Result<ExportOutcome, StreetboxError> {
        self.exporter
            .export(&mut self.pipeline, self.view.as_ref())
            .await
    }

    /// Replace the coordinate list with the parsed contents of `text`.
    ///
    /// Moves the view to the first entry. Returns the number of entries.
    pub fn load_coordinates(&mut self, text: &str) -> usize {
        self.coordinates = CoordinateCursor::from_text(text);
        if let Some(first) = self.coordinates.current() {
            self.move_view(first);
        }
        self.coordinates.len()
    }

    pub fn next_coordinate(&mut self) -> Option<LatLng> {
        let position = self.coordinates.forward()?;
        self.move_view(position);
        Some(position)
    }

    pub fn previous_coordinate(&mut self) -> Option<LatLng> {
        let position = self.coordinates.back()?;
        self.move_view(position);
        Some(position)
    }

    pub fn toggle_coordinate_list(&mut self) -> bool {
        self.coordinate_list_visible = !self.coordinate_list_visible;
        self.coordinate_list_visible
    }

    /// Run the action bound to a key command.
    ///
    /// Returns the export outcome for [`Command::Export`], `None` otherwise.
    pub async fn dispatch(
        &mut self,
        command: Command,
    ) -> Result<Option<ExportOutcome>, StreetboxError> {
        tracing::debug!(?command, stage = %self.stage(), "dispatch");
        match command {
            Command::Capture => {
                self.capture().await?;
            }
            Command::Reset => self.reset(),
            Command::Export => return self.export().await.map(Some),
            Command::ToggleCoordinateList => {
                self.toggle_coordinate_list();
            }
            Command::NextCoordinate => {
                self.next_coordinate();
            }
            Command::PreviousCoordinate => {
                self.previous_coordinate();
            }
        }
        Ok(None)
    }

    fn move_view(&mut self, position: LatLng) {
        self.view = Some(match self.view {
            Some(view) => view.moved_to(position),
            None => ViewPosition::at(position),
        });
    }

    fn warn_on_unknown_label(&self, entry: &BoundingBox) {
        if !self.is_known_label(&entry.label) {
            tracing::warn!(label = %entry.label, "label outside configured vocabulary");
        }
    }
}
