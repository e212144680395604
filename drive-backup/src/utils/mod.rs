//! Utility modules for the backup run.

pub mod errors;
pub mod logger;

pub use errors::{BackupError, Result};
