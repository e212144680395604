//! Directory traversal for archive entries.
//!
//! Walks a source directory in a stable (name-sorted) order so that the
//! archive built from it is laid out the same way on every run. Symbolic
//! links are reported as links and never followed.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// What an entry below the walked root is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
    /// A link of any kind: to a file, to a directory, or dangling
    Symlink,
}

/// Information about an entry discovered during walking
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the entry
    pub path: PathBuf,

    /// Relative path from the root
    pub relative_path: PathBuf,

    pub entry_type: EntryType,
}

impl FileInfo {
    fn from_entry(entry: &DirEntry, root: &Path) -> Self {
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root)
            .unwrap_or(&path)
            .to_path_buf();

        // Without follow_links the file type is the link's own type
        let file_type = entry.file_type();
        let entry_type = if file_type.is_symlink() {
            EntryType::Symlink
        } else if file_type.is_dir() {
            EntryType::Directory
        } else {
            EntryType::File
        };

        Self {
            path,
            relative_path,
            entry_type,
        }
    }

    /// Relative path with `/` separators, as used for archive member names.
    pub fn relative_name(&self) -> String {
        self.relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Walk a directory tree and collect every entry below `root`.
///
/// The root itself is not reported. Fails if `root` is missing, is not a
/// directory, or any entry below it cannot be read.
///
/// # Example
/// ```no_run
/// use drive_backup::fs::walker::walk_directory;
/// use std::path::Path;
///
/// let entries = walk_directory(Path::new("/data")).unwrap();
/// println!("Found {} entries", entries.len());
/// ```
pub fn walk_directory(root: &Path) -> std::io::Result<Vec<FileInfo>> {
    if !std::fs::metadata(root)?.is_dir() {
        return Err(std::io::Error::other(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name();

    let mut entries = Vec::new();
    for entry in walker {
        let entry = entry?;
        entries.push(FileInfo::from_entry(&entry, root));
    }

    Ok(entries)
}
