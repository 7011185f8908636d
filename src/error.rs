use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = CrawlError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("IO error {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    #[error("Failed to walk directory {1}: {0}")]
    Walk(#[source] walkdir::Error, PathBuf),

    #[error("Cannot describe dataset {0}: {1}")]
    Describe(PathBuf, String),

    /// The engine refused to add the dataset to the map.
    #[error("Cannot add {0} to the map: {1}")]
    LayerCreation(PathBuf, String),

    #[error("Failed to save layer file {0}: {1}")]
    LayerSave(PathBuf, String),

    #[error("Invalid layer file {1}: {0}")]
    LayerJson(#[source] serde_json::Error, PathBuf),

    #[error("Metadata XML error: {0}")]
    Xml(String),

    #[error("Cannot reproject extent from {from} to {to}: {reason}")]
    Reprojection { from: i32, to: i32, reason: String },

    #[error("Catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[cfg(feature = "gdal")]
    #[error(transparent)]
    Gdal(#[from] gdal::errors::GdalError),
}

impl CrawlError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |e| Self::Io(e, path)
    }

    pub(crate) fn xml(e: impl std::fmt::Display) -> Self {
        Self::Xml(e.to_string())
    }
}
