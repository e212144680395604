//! In-memory backend for tests.

use super::{DriveBackend, Media, RemoteFolder, UploadMetadata};
use crate::{BackupError, Result};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub parents: Vec<String>,
    pub content: Vec<u8>,
}

#[derive(Debug, Default)]
struct MemoryState {
    folders: Vec<RemoteFolder>,
    files: Vec<StoredFile>,
    next_id: u64,
    folders_created: usize,
    list_calls: usize,
    fail_listing: bool,
    fail_folder_creation: bool,
    fail_uploads_matching: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MemoryDrive {
    state: Mutex<MemoryState>,
}

impl MemoryDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folders(folders: Vec<RemoteFolder>) -> Self {
        let drive = Self::new();
        drive.state.lock().unwrap().folders = folders;
        drive
    }

    pub fn fail_listing(self) -> Self {
        self.state.lock().unwrap().fail_listing = true;
        self
    }

    pub fn fail_folder_creation(self) -> Self {
        self.state.lock().unwrap().fail_folder_creation = true;
        self
    }

    /// Uploads whose source path contains `fragment` fail.
    pub fn fail_uploads_matching(self, fragment: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_uploads_matching
            .push(fragment.to_string());
        self
    }

    pub fn folders(&self) -> Vec<RemoteFolder> {
        self.state.lock().unwrap().folders.clone()
    }

    pub fn files(&self) -> Vec<StoredFile> {
        self.state.lock().unwrap().files.clone()
    }

    pub fn folders_created(&self) -> usize {
        self.state.lock().unwrap().folders_created
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }
}

#[async_trait]
impl DriveBackend for MemoryDrive {
    async fn list_folders(&self) -> Result<Vec<RemoteFolder>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.fail_listing {
            return Err(BackupError::Backend("listing unavailable".to_string()));
        }
        Ok(state.folders.clone())
    }

    async fn create_folder(&self, name: &str, _parent_id: Option<&str>) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if state.fail_folder_creation {
            return Err(BackupError::Backend("insufficient permissions".to_string()));
        }
        state.next_id += 1;
        let id = format!("folder-{}", state.next_id);
        state.folders.push(RemoteFolder {
            id: id.clone(),
            name: name.to_string(),
            trashed: false,
        });
        state.folders_created += 1;
        Ok(id)
    }

    async fn create_file(
        &self,
        metadata: &UploadMetadata,
        media: &Media,
        parent_id: Option<&str>,
    ) -> Result<String> {
        let path = media.path.to_string_lossy().into_owned();
        let should_fail = self
            .state
            .lock()
            .unwrap()
            .fail_uploads_matching
            .iter()
            .any(|fragment| path.contains(fragment.as_str()));
        if should_fail {
            return Err(BackupError::Backend(format!("upload of {} rejected", path)));
        }

        let content = tokio::fs::read(&media.path)
            .await
            .map_err(|e| BackupError::Backend(format!("{}: {}", path, e)))?;

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("file-{}", state.next_id);
        state.files.push(StoredFile {
            id: id.clone(),
            name: metadata.name.clone(),
            mime_type: media.mime_type.clone(),
            parents: parent_id.map(|p| vec![p.to_string()]).unwrap_or_default(),
            content,
        });
        Ok(id)
    }
}
