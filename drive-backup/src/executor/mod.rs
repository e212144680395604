//! Backup executor - runs the archive phase, then the upload phase.
//!
//! - Archive: load `toArchive.json`, build the ZIP.
//! - Upload: load `files.json`, resolve the backup folder, upload every file.
//!
//! The archive is finished before any remote call is made, and the folder is
//! resolved before any upload starts.

pub mod upload;

use crate::archive::{ArchiveBuilder, ArchiveSummary};
use crate::config::Config;
use crate::drive::{resolve_folder, DriveBackend, Resolution};
use crate::manifest::{load_archive_manifest, load_upload_manifest};
use crate::Result;
use std::sync::Arc;
use tracing::info;
use upload::{UploadDispatcher, UploadOutcome};

/// What the upload phase did
#[derive(Debug)]
pub struct UploadReport {
    pub folder: Resolution,
    pub outcomes: Vec<UploadOutcome>,
}

/// Everything a full run did
#[derive(Debug)]
pub struct BackupReport {
    pub archive: ArchiveSummary,
    pub upload: UploadReport,
}

pub struct BackupExecutor {
    config: Config,
}

impl BackupExecutor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the archive from the archive manifest. Any failure is fatal.
    pub async fn archive(&self) -> Result<ArchiveSummary> {
        let entries = load_archive_manifest(&self.config.archive.manifest_path)?;
        info!(
            "Loaded {} archive entries from {}",
            entries.len(),
            self.config.archive.manifest_path.display()
        );

        ArchiveBuilder::new(&self.config.archive).build(entries).await
    }

    /// Resolve the backup folder and upload every declared file into it.
    ///
    /// Manifest and folder resolution failures are fatal; individual upload
    /// failures only show up in the returned outcomes.
    pub async fn upload(&self, backend: Arc<dyn DriveBackend>) -> Result<UploadReport> {
        let files = load_upload_manifest(&self.config.upload.manifest_path)?;

        info!("=== START ===");
        let folder = resolve_folder(backend.as_ref(), &self.config.drive.folder_name).await?;

        let dispatcher = UploadDispatcher::new(backend, self.config.upload.timestamp_token.clone());
        let outcomes = dispatcher.dispatch(Some(folder.id()), files).await;

        info!(" > Files uploaded !");
        info!("=== END ===");

        Ok(UploadReport { folder, outcomes })
    }

    /// Archive, then upload through `backend`.
    pub async fn execute(&self, backend: Arc<dyn DriveBackend>) -> Result<BackupReport> {
        let archive = self.archive().await?;
        let upload = self.upload(backend).await?;
        Ok(BackupReport { archive, upload })
    }
}
