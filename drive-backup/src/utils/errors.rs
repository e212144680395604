//! Custom error types for the backup run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Authorization error: {0}")]
    Auth(String),

    #[error("Drive API error: {0}")]
    Backend(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackupError {
    /// A source path named by a manifest entry could not be read.
    pub fn source_path(path: &std::path::Path, err: std::io::Error) -> Self {
        BackupError::Manifest(format!("{}: {}", path.display(), err))
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
