//! Manifest types for the archive and upload phases.
//!
//! Both manifests are plain JSON arrays. Loading only checks the JSON shape;
//! whether the paths exist is decided by the component that consumes them.

use crate::{BackupError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One or several source paths for an archive entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSpec {
    Single(PathBuf),
    Multiple(Vec<PathBuf>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// Entry of `toArchive.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub path: PathSpec,
    /// Folder inside the archive the source lands in
    pub destination_path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// Entry of `files.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFile {
    /// Remote name, may contain the timestamp token
    pub name: String,
    pub mime_type: String,
    /// Local source
    pub path: PathBuf,
}

impl std::fmt::Display for PathSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSpec::Single(path) => write!(f, "{}", path.display()),
            PathSpec::Multiple(paths) => {
                let joined: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "{}", joined.join(","))
            }
        }
    }
}

/// Load the list of entries to archive.
pub fn load_archive_manifest(path: &Path) -> Result<Vec<ArchiveEntry>> {
    load_json(path)
}

/// Load the list of files to upload.
pub fn load_upload_manifest(path: &Path) -> Result<Vec<UploadFile>> {
    load_json(path)
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| BackupError::Manifest(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| BackupError::Manifest(format!("invalid {}: {}", path.display(), e)))
}
