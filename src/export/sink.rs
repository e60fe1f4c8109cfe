//! Destinations for exported artifact pairs.

use std::fs;
use std::path::{Path, PathBuf};

use crate::annotation::voc::VOC_XML_EXTENSION;
use crate::error::StreetboxError;

/// Extension used for exported images.
pub const IMAGE_EXTENSION: &str = "jpg";

/// An annotation document and the image it describes, sharing a base name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPair {
    pub basename: String,
    pub annotation_xml: String,
    pub image_jpeg: Vec<u8>,
}

impl ArtifactPair {
    pub fn annotation_file_name(&self) -> String {
        format!("{}.{VOC_XML_EXTENSION}", self.basename)
    }

    pub fn image_file_name(&self) -> String {
        format!("{}.{IMAGE_EXTENSION}", self.basename)
    }
}

/// Receives finished export pairs.
pub trait ArtifactSink {
    fn emit(&mut self, pair: &ArtifactPair) -> Result<(), StreetboxError>;
}

/// Writes `<basename>.xml` and `<basename>.jpg` into a directory.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactSink for DirectorySink {
    fn emit(&mut self, pair: &ArtifactPair) -> Result<(), StreetboxError> {
        fs::create_dir_all(&self.root).map_err(StreetboxError::Io)?;

        let xml_path = self.root.join(pair.annotation_file_name());
        let image_path = self.root.join(pair.image_file_name());
        fs::write(&xml_path, &pair.annotation_xml).map_err(StreetboxError::Io)?;
        fs::write(&image_path, &pair.image_jpeg).map_err(StreetboxError::Io)?;

        tracing::info!(
            annotation = %xml_path.display(),
            image = %image_path.display(),
            "export written"
        );
        Ok(())
    }
}

/// Keeps emitted pairs in memory, for embedding or inspection.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub emitted: Vec<ArtifactPair>,
}

impl ArtifactSink for MemorySink {
    fn emit(&mut self, pair: &ArtifactPair) -> Result<(), StreetboxError> {
        self.emitted.push(pair.clone());
        Ok(())
    }
}
