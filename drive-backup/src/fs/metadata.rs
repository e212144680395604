//! Source file metadata carried into archive members.
//!
//! ZIP members keep the source's permission bits and modification time.

use chrono::{DateTime, Datelike, Local, Timelike};
use std::fs;
use std::path::Path;

/// Metadata of a source file or directory
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// File size in bytes
    pub size: u64,

    /// Last modified time, local clock (ZIP timestamps carry no zone)
    pub modified: DateTime<Local>,

    /// File permissions (Unix mode bits)
    pub permissions: Option<u32>,

    /// Is this a directory?
    pub is_dir: bool,

    /// Is this a symbolic link? Links are described, not resolved.
    pub is_symlink: bool,
}

impl FileMetadata {
    /// Extract metadata from a path without following a final symlink
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::symlink_metadata(path)?;
        let modified: DateTime<Local> = metadata.modified()?.into();

        #[cfg(unix)]
        let permissions = {
            use std::os::unix::fs::PermissionsExt;
            Some(metadata.permissions().mode())
        };

        #[cfg(not(unix))]
        let permissions = None;

        Ok(Self {
            size: metadata.len(),
            modified,
            permissions,
            is_dir: metadata.is_dir(),
            is_symlink: metadata.file_type().is_symlink(),
        })
    }

    /// Modification time in ZIP form. ZIP cannot express dates before 1980,
    /// those fall back to the format's epoch.
    pub fn zip_datetime(&self) -> zip::DateTime {
        let m = &self.modified;
        u16::try_from(m.year())
            .ok()
            .and_then(|year| {
                zip::DateTime::from_date_and_time(
                    year,
                    m.month() as u8,
                    m.day() as u8,
                    m.hour() as u8,
                    m.minute() as u8,
                    m.second().min(59) as u8,
                )
                .ok()
            })
            .unwrap_or_default()
    }

    /// Apply these metadata to zip member options
    pub fn apply_to(&self, options: zip::write::FileOptions) -> zip::write::FileOptions {
        let options = options.last_modified_time(self.zip_datetime());
        match self.permissions {
            Some(mode) => options.unix_permissions(mode & 0o7777),
            None => options,
        }
    }
}
