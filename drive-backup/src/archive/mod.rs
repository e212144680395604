//! Archive builder - turns the archive manifest into a single ZIP file.
//!
//! Entries are written in manifest order. Directory entries are walked in
//! name order, so the same inputs always give the same member layout.
//! Symlinks are stored as links and never followed. Any unreadable source
//! aborts the whole archive and the partial output is removed.

use crate::config::ArchiveConfig;
use crate::fs::metadata::FileMetadata;
use crate::fs::walker::{walk_directory, EntryType};
use crate::manifest::{ArchiveEntry, EntryKind, PathSpec};
use crate::transfer::progress::format_bytes;
use crate::{BackupError, Result};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// What a finished archive contains
#[derive(Debug, Clone)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    /// Files, directories and symlinks written
    pub members: usize,
    /// Size of the archive on disk
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    output_path: PathBuf,
    compression_level: i32,
}

impl ArchiveBuilder {
    pub fn new(config: &ArchiveConfig) -> Self {
        Self {
            output_path: config.output_path.clone(),
            compression_level: config.compression_level,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Build the archive on the blocking pool.
    pub async fn build(&self, entries: Vec<ArchiveEntry>) -> Result<ArchiveSummary> {
        let builder = self.clone();
        tokio::task::spawn_blocking(move || builder.build_blocking(&entries))
            .await
            .map_err(|e| BackupError::Io(std::io::Error::other(e)))?
    }

    /// Build the archive, replacing any previous file at the output path.
    pub fn build_blocking(&self, entries: &[ArchiveEntry]) -> Result<ArchiveSummary> {
        info!("=== ARCHIVING ===");

        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let result = File::create(&self.output_path)
            .map_err(BackupError::from)
            .and_then(|file| self.write_entries(BufWriter::new(file), entries));

        let members = match result {
            Ok(members) => members,
            Err(e) => {
                error!("Archiving failed: {}", e);
                let _ = std::fs::remove_file(&self.output_path);
                return Err(e);
            }
        };

        let bytes = std::fs::metadata(&self.output_path)?.len();
        info!(
            "=== ARCHIVING DONE === ({} members, {})",
            members,
            format_bytes(bytes)
        );

        Ok(ArchiveSummary {
            path: self.output_path.clone(),
            members,
            bytes,
        })
    }

    fn write_entries<W: Write + Seek>(&self, writer: W, entries: &[ArchiveEntry]) -> Result<usize> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level));

        let mut members = 0usize;

        for entry in entries {
            info!(" > Archiving : {} > {}", entry.path, entry.destination_path);

            match (entry.kind, &entry.path) {
                (EntryKind::Directory, PathSpec::Single(root)) => {
                    members += append_directory(&mut zip, root, &entry.destination_path, options)?;
                }
                (EntryKind::Directory, PathSpec::Multiple(_)) => {
                    return Err(BackupError::Manifest(format!(
                        "directory entry for '{}' must name a single path",
                        entry.destination_path
                    )));
                }
                (EntryKind::File, PathSpec::Single(path)) => {
                    let name = member_name(&entry.destination_path, &basename(path)?);
                    append_file(&mut zip, path, &name, options)?;
                    members += 1;
                }
                (EntryKind::File, PathSpec::Multiple(paths)) => {
                    for path in paths {
                        let name = member_name(&entry.destination_path, &basename(path)?);
                        append_file(&mut zip, path, &name, options)?;
                        members += 1;
                    }
                }
            }
        }

        let mut writer = zip.finish()?;
        writer.flush()?;

        Ok(members)
    }
}

/// Add every file, sub-directory and symlink below `root` under `destination`.
fn append_directory<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    root: &Path,
    destination: &str,
    options: FileOptions,
) -> Result<usize> {
    let entries = walk_directory(root).map_err(|e| BackupError::source_path(root, e))?;

    let mut members = 0usize;
    for info in &entries {
        let name = member_name(destination, &info.relative_name());
        match info.entry_type {
            EntryType::Directory => {
                let metadata = FileMetadata::from_path(&info.path)
                    .map_err(|e| BackupError::source_path(&info.path, e))?;
                zip.add_directory(name, metadata.apply_to(options))?;
            }
            EntryType::Symlink => append_symlink(zip, &info.path, &name, options)?,
            EntryType::File => {
                append_file(zip, &info.path, &name, options)?;
            }
        }
        members += 1;
    }

    Ok(members)
}

/// Add `source` as member `name`. A symlink is stored as a link.
fn append_file<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    source: &Path,
    name: &str,
    options: FileOptions,
) -> Result<u64> {
    let metadata =
        FileMetadata::from_path(source).map_err(|e| BackupError::source_path(source, e))?;
    if metadata.is_symlink {
        append_symlink(zip, source, name, options)?;
        return Ok(0);
    }
    if metadata.is_dir {
        return Err(BackupError::Manifest(format!(
            "{} is a directory, use an entry of type \"directory\"",
            source.display()
        )));
    }

    let mut file = File::open(source).map_err(|e| BackupError::source_path(source, e))?;

    let options = metadata
        .apply_to(options)
        .large_file(metadata.size >= u64::from(u32::MAX));
    zip.start_file(name, options)?;
    let written = std::io::copy(&mut file, zip).map_err(|e| BackupError::source_path(source, e))?;

    debug!("   + {} ({})", name, format_bytes(written));
    Ok(written)
}

/// Store the link itself; its target is never read, even when it dangles.
fn append_symlink<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    source: &Path,
    name: &str,
    options: FileOptions,
) -> Result<()> {
    let target = std::fs::read_link(source).map_err(|e| BackupError::source_path(source, e))?;
    let metadata =
        FileMetadata::from_path(source).map_err(|e| BackupError::source_path(source, e))?;

    let target = target.to_string_lossy().into_owned();
    debug!("   + {} -> {}", name, target);
    zip.add_symlink(name, target, metadata.apply_to(options))?;
    Ok(())
}

/// Archive member name for `relative` placed inside `destination`.
fn member_name(destination: &str, relative: &str) -> String {
    let destination = destination.trim_end_matches('/');
    if destination.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", destination, relative)
    }
}

fn basename(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| BackupError::Manifest(format!("{} has no file name", path.display())))
}
