//! Remote storage: the backend contract, folder resolution and the
//! Google Drive implementation.

pub mod auth;
pub mod client;
pub mod folder;

#[cfg(test)]
pub(crate) mod memory;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use client::DriveClient;
pub use folder::{resolve_folder, Resolution};

/// Mime type Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A folder as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub trashed: bool,
}

/// Metadata of a file to create remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMetadata {
    pub name: String,
}

/// Local content of a file to create remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub mime_type: String,
    pub path: PathBuf,
}

/// Minimal remote storage contract the backup run depends on.
#[async_trait]
pub trait DriveBackend: Send + Sync {
    /// Every folder visible to the account, in backend order.
    async fn list_folders(&self) -> Result<Vec<RemoteFolder>>;

    /// Create a folder and return its id. `None` creates it at the root.
    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<String>;

    /// Create a file from local media and return its id. `None` uploads to the root.
    async fn create_file(
        &self,
        metadata: &UploadMetadata,
        media: &Media,
        parent_id: Option<&str>,
    ) -> Result<String>;
}
