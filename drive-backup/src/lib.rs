//! Drive Backup Library
//!
//! Archives a declarative set of files and directories into a ZIP, then
//! uploads it (with any other declared files) into a Google Drive folder.

pub mod archive;
pub mod config;
pub mod drive;
pub mod executor;
pub mod fs;
pub mod manifest;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use utils::errors::{BackupError, Result};
