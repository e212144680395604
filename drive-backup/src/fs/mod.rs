//! File system helpers: directory traversal and source metadata.

pub mod metadata;
pub mod walker;
