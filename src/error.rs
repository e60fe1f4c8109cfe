use std::path::PathBuf;
use thiserror::Error;

/// The main error type for streetbox operations.
#[derive(Debug, Error)]
pub enum StreetboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode JPEG: {0}")]
    ImageEncode(#[source] image::ImageError),

    #[error("No drawing surface available for a {width}x{height} buffer")]
    RenderContextUnavailable { width: u32, height: u32 },

    #[error("Invalid display size {width}x{height} (must be positive and finite)")]
    InvalidDisplaySize { width: f64, height: f64 },

    #[error("Surface capture failed: {0}")]
    CaptureFailed(String),

    #[error("Could not resolve image dimensions: {0}")]
    DimensionResolve(String),

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse annotation XML from {path}: {message}")]
    AnnotationParse { path: PathBuf, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
