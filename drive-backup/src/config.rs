//! Configuration management for the backup run.
//!
//! Loads configuration from a TOML file. Every field has a default so the
//! binary runs without one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// OAuth client secret JSON ("installed" application)
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,

    /// Where the authorized token is persisted between runs.
    /// Delete it after changing `scopes`.
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,

    /// OAuth scopes requested during interactive authorization
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Name of the folder backups are uploaded into
    #[serde(default = "default_folder_name")]
    pub folder_name: String,

    /// Drive v3 metadata endpoint
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Drive v3 media upload endpoint
    #[serde(default = "default_upload_base_url")]
    pub upload_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// JSON list of entries to archive
    #[serde(default = "default_archive_manifest_path")]
    pub manifest_path: PathBuf,

    /// Archive written on every run, replacing the previous one
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Deflate level (0-9)
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// JSON list of files to upload
    #[serde(default = "default_upload_manifest_path")]
    pub manifest_path: PathBuf,

    /// Token in upload names replaced by the upload time
    #[serde(default = "default_timestamp_token")]
    pub timestamp_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_token_path() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_scopes() -> Vec<String> {
    vec!["https://www.googleapis.com/auth/drive".to_string()]
}

fn default_folder_name() -> String {
    "DockerBackups".to_string()
}

fn default_api_base_url() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_upload_base_url() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}

fn default_archive_manifest_path() -> PathBuf {
    PathBuf::from("toArchive.json")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("data/archive.zip")
}

fn default_compression_level() -> i32 {
    5
}

fn default_upload_manifest_path() -> PathBuf {
    PathBuf::from("files.json")
}

fn default_timestamp_token() -> String {
    "%TIMESTAMP%".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            token_path: default_token_path(),
            scopes: default_scopes(),
            folder_name: default_folder_name(),
            api_base_url: default_api_base_url(),
            upload_base_url: default_upload_base_url(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            manifest_path: default_archive_manifest_path(),
            output_path: default_output_path(),
            compression_level: default_compression_level(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            manifest_path: default_upload_manifest_path(),
            timestamp_token: default_timestamp_token(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::Result<()> {
        if !(0..=9).contains(&self.archive.compression_level) {
            return Err(crate::BackupError::Config(format!(
                "archive.compression_level must be between 0 and 9, got {}",
                self.archive.compression_level
            )));
        }
        if self.drive.folder_name.is_empty() {
            return Err(crate::BackupError::Config(
                "drive.folder_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.archive.output_path, PathBuf::from("data/archive.zip"));
        assert_eq!(config.archive.compression_level, 5);
        assert_eq!(config.drive.folder_name, "DockerBackups");
        assert_eq!(config.drive.token_path, PathBuf::from("token.json"));
        assert_eq!(config.upload.timestamp_token, "%TIMESTAMP%");
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[drive]\nfolder_name = \"NightlyBackups\"\n\n[log]\nlevel = \"debug\"")?;

        let config = Config::from_file(file.path())?;
        assert_eq!(config.drive.folder_name, "NightlyBackups");
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.drive.scopes, default_scopes());
        assert_eq!(config.archive.compression_level, 5);
        Ok(())
    }

    #[test]
    fn test_rejects_out_of_range_compression() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[archive]\ncompression_level = 12")?;

        assert!(Config::from_file(file.path()).is_err());
        Ok(())
    }
}
