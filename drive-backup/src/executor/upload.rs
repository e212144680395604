//! Upload dispatcher - sends every declared file to the backup folder.
//!
//! All uploads start at once, one task per file. A failed upload is logged
//! and reported in its outcome; it never stops the others.

use crate::drive::{DriveBackend, Media, UploadMetadata};
use crate::manifest::UploadFile;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};

/// Result of one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { name: String, id: String },
    Failed { name: String, error: String },
}

impl UploadOutcome {
    pub fn name(&self) -> &str {
        match self {
            UploadOutcome::Uploaded { name, .. } | UploadOutcome::Failed { name, .. } => name,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded { .. })
    }
}

/// Replace every occurrence of `token` in `name` with `now` in epoch milliseconds.
pub fn substitute_timestamp(name: &str, token: &str, now: DateTime<Utc>) -> String {
    if token.is_empty() {
        return name.to_string();
    }
    name.replace(token, &now.timestamp_millis().to_string())
}

pub struct UploadDispatcher {
    backend: Arc<dyn DriveBackend>,
    timestamp_token: String,
}

impl UploadDispatcher {
    pub fn new(backend: Arc<dyn DriveBackend>, timestamp_token: impl Into<String>) -> Self {
        Self {
            backend,
            timestamp_token: timestamp_token.into(),
        }
    }

    /// Upload `files` into `folder_id` (the root when `None`).
    ///
    /// Outcomes are returned in manifest order; completion is logged in
    /// whatever order the uploads finish.
    pub async fn dispatch(&self, folder_id: Option<&str>, files: Vec<UploadFile>) -> Vec<UploadOutcome> {
        let folder_id: Option<Arc<str>> = folder_id.map(Arc::from);
        let mut handles = Vec::with_capacity(files.len());

        for file in files {
            let label = file.name.clone();
            let backend = Arc::clone(&self.backend);
            let folder_id = folder_id.clone();
            let token = self.timestamp_token.clone();

            let handle = tokio::spawn(async move {
                // Timestamp taken per file, when its upload starts
                let name = substitute_timestamp(&file.name, &token, Utc::now());
                let metadata = UploadMetadata { name: name.clone() };
                let media = Media {
                    mime_type: file.mime_type,
                    path: file.path,
                };

                match backend.create_file(&metadata, &media, folder_id.as_deref()).await {
                    Ok(id) => {
                        info!(" > Uploaded {}", name);
                        UploadOutcome::Uploaded { name, id }
                    }
                    Err(e) => {
                        error!("Failed to upload {} ({}): {}", name, media.path.display(), e);
                        UploadOutcome::Failed {
                            name,
                            error: e.to_string(),
                        }
                    }
                }
            });

            handles.push((label, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (label, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!("Upload task {} panicked: {}", label, e);
                    outcomes.push(UploadOutcome::Failed {
                        name: label,
                        error: e.to_string(),
                    });
                }
            }
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::memory::MemoryDrive;
    use chrono::TimeZone;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn upload_file(dir: &Path, file_name: &str, name: &str) -> UploadFile {
        let path = dir.join(file_name);
        fs::write(&path, file_name.as_bytes()).unwrap();
        UploadFile {
            name: name.to_string(),
            mime_type: "application/octet-stream".to_string(),
            path,
        }
    }

    #[test]
    fn test_substitute_timestamp() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            substitute_timestamp("backup-%TIMESTAMP%.zip", "%TIMESTAMP%", now),
            "backup-1700000000123.zip"
        );
        assert_eq!(substitute_timestamp("static.zip", "%TIMESTAMP%", now), "static.zip");
        assert_eq!(substitute_timestamp("a.zip", "", now), "a.zip");
    }

    #[tokio::test]
    async fn test_uploaded_names_carry_numeric_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let drive = Arc::new(MemoryDrive::new());
        let dispatcher = UploadDispatcher::new(drive.clone(), "%TIMESTAMP%");

        let files = vec![upload_file(temp_dir.path(), "archive.zip", "DockerBackup-%TIMESTAMP%.zip")];
        let outcomes = dispatcher.dispatch(Some("folder-9"), files).await;

        assert_eq!(outcomes.len(), 1);

        let stored = drive.files();
        assert_eq!(
            outcomes[0],
            UploadOutcome::Uploaded {
                name: stored[0].name.clone(),
                id: stored[0].id.clone(),
            }
        );
        assert_eq!(stored[0].mime_type, "application/octet-stream");
        let name = &stored[0].name;
        assert!(!name.contains("%TIMESTAMP%"));
        let digits = name
            .strip_prefix("DockerBackup-")
            .and_then(|rest| rest.strip_suffix(".zip"))
            .unwrap();
        assert!(!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(stored[0].parents, vec!["folder-9".to_string()]);
        assert_eq!(stored[0].content, b"archive.zip");
    }

    #[tokio::test]
    async fn test_failed_upload_does_not_stop_others() {
        let temp_dir = TempDir::new().unwrap();
        let drive = Arc::new(MemoryDrive::new().fail_uploads_matching("second"));
        let dispatcher = UploadDispatcher::new(drive.clone(), "%TIMESTAMP%");

        let files = vec![
            upload_file(temp_dir.path(), "first.txt", "first.txt"),
            upload_file(temp_dir.path(), "second.txt", "second.txt"),
            upload_file(temp_dir.path(), "third.txt", "third.txt"),
        ];
        let outcomes = dispatcher.dispatch(Some("folder-1"), files).await;

        assert!(outcomes[0].is_uploaded());
        assert!(!outcomes[1].is_uploaded());
        assert!(outcomes[2].is_uploaded());
        assert_eq!(outcomes[1].name(), "second.txt");

        let mut names: Vec<String> = drive.files().into_iter().map(|f| f.name).collect();
        names.sort();
        assert_eq!(names, vec!["first.txt", "third.txt"]);
    }

    #[tokio::test]
    async fn test_missing_local_file_is_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let drive = Arc::new(MemoryDrive::new());
        let dispatcher = UploadDispatcher::new(drive.clone(), "%TIMESTAMP%");

        let missing = UploadFile {
            name: "gone.zip".to_string(),
            mime_type: "application/zip".to_string(),
            path: temp_dir.path().join("gone.zip"),
        };
        let files = vec![missing, upload_file(temp_dir.path(), "kept.txt", "kept.txt")];
        let outcomes = dispatcher.dispatch(None, files).await;

        assert!(matches!(&outcomes[0], UploadOutcome::Failed { name, .. } if name == "gone.zip"));
        assert!(outcomes[1].is_uploaded());
    }

    #[tokio::test]
    async fn test_each_file_keeps_its_mime_type_and_id() {
        let temp_dir = TempDir::new().unwrap();
        let drive = Arc::new(MemoryDrive::new());
        let dispatcher = UploadDispatcher::new(drive.clone(), "%TIMESTAMP%");

        let mut compose = upload_file(temp_dir.path(), "compose.yml", "compose.yml");
        compose.mime_type = "text/yaml".to_string();
        let mut archive = upload_file(temp_dir.path(), "archive.zip", "archive.zip");
        archive.mime_type = "application/zip".to_string();

        let outcomes = dispatcher.dispatch(Some("folder-1"), vec![compose, archive]).await;

        let stored = drive.files();
        assert_eq!(stored.len(), 2);
        for outcome in &outcomes {
            let UploadOutcome::Uploaded { name, id } = outcome else {
                panic!("expected upload, got {:?}", outcome);
            };
            let file = stored.iter().find(|f| &f.name == name).unwrap();
            assert_eq!(&file.id, id);
            let expected = if name == "compose.yml" { "text/yaml" } else { "application/zip" };
            assert_eq!(file.mime_type, expected);
        }
        assert_ne!(stored[0].id, stored[1].id);
    }

    #[tokio::test]
    async fn test_without_folder_uploads_to_root() {
        let temp_dir = TempDir::new().unwrap();
        let drive = Arc::new(MemoryDrive::new());
        let dispatcher = UploadDispatcher::new(drive.clone(), "%TIMESTAMP%");

        dispatcher
            .dispatch(None, vec![upload_file(temp_dir.path(), "notes.txt", "notes.txt")])
            .await;

        assert!(drive.files()[0].parents.is_empty());
    }
}
