//! Find-or-create resolution of the backup folder.

use super::{DriveBackend, RemoteFolder};
use crate::Result;
use tracing::info;

/// Outcome of resolving the backup folder. Either way the id is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An existing, non-trashed folder matched by name
    Found(String),
    /// No match existed and a folder was created at the root
    Created(String),
}

impl Resolution {
    pub fn id(&self) -> &str {
        match self {
            Resolution::Found(id) | Resolution::Created(id) => id,
        }
    }

    pub fn into_id(self) -> String {
        match self {
            Resolution::Found(id) | Resolution::Created(id) => id,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Resolution::Created(_))
    }
}

/// First non-trashed folder named exactly `name`, in listing order.
pub fn find_folder<'a>(folders: &'a [RemoteFolder], name: &str) -> Option<&'a RemoteFolder> {
    folders.iter().find(|folder| !folder.trashed && folder.name == name)
}

/// Return the id of the folder named `name`, creating it at the root when
/// no live folder has that name. Listing or creation failures are returned
/// as-is; nothing is retried.
pub async fn resolve_folder(backend: &dyn DriveBackend, name: &str) -> Result<Resolution> {
    let folders = backend.list_folders().await?;

    if let Some(folder) = find_folder(&folders, name) {
        info!(" > Found folder {} | ID is {}", name, folder.id);
        return Ok(Resolution::Found(folder.id.clone()));
    }

    info!(" > Creating a folder...");
    let id = backend.create_folder(name, None).await?;
    info!(" > Folder created. Id is {}", id);

    Ok(Resolution::Created(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::memory::MemoryDrive;
    use crate::BackupError;

    fn folder(id: &str, name: &str, trashed: bool) -> RemoteFolder {
        RemoteFolder {
            id: id.to_string(),
            name: name.to_string(),
            trashed,
        }
    }

    #[tokio::test]
    async fn test_creates_missing_folder_then_reuses_it() -> Result<()> {
        let drive = MemoryDrive::new();

        let first = resolve_folder(&drive, "DockerBackups").await?;
        assert!(first.was_created());
        assert_eq!(drive.folders_created(), 1);

        let second = resolve_folder(&drive, "DockerBackups").await?;
        assert_eq!(second, Resolution::Found(first.id().to_string()));
        assert_eq!(drive.folders_created(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() -> Result<()> {
        let drive = MemoryDrive::with_folders(vec![folder("abc", "DockerBackups", false)]);

        let first = resolve_folder(&drive, "DockerBackups").await?;
        let second = resolve_folder(&drive, "DockerBackups").await?;

        assert_eq!(first, Resolution::Found("abc".to_string()));
        assert_eq!(first, second);
        assert_eq!(drive.folders_created(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_trashed_match_is_ignored() -> Result<()> {
        let drive = MemoryDrive::with_folders(vec![folder("old", "DockerBackups", true)]);

        let resolution = resolve_folder(&drive, "DockerBackups").await?;

        assert!(resolution.was_created());
        assert_ne!(resolution.id(), "old");
        assert_eq!(drive.folders_created(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_name_match_is_exact() -> Result<()> {
        let drive = MemoryDrive::with_folders(vec![
            folder("a", "dockerbackups", false),
            folder("b", "DockerBackups2", false),
        ]);

        let resolution = resolve_folder(&drive, "DockerBackups").await?;
        assert!(resolution.was_created());
        Ok(())
    }

    #[tokio::test]
    async fn test_first_duplicate_wins() -> Result<()> {
        let drive = MemoryDrive::with_folders(vec![
            folder("trashed", "DockerBackups", true),
            folder("first", "DockerBackups", false),
            folder("second", "DockerBackups", false),
        ]);

        let resolution = resolve_folder(&drive, "DockerBackups").await?;
        assert_eq!(resolution.into_id(), "first");
        assert_eq!(drive.folders().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_creation_failure_is_returned() {
        let drive = MemoryDrive::new().fail_folder_creation();

        let result = resolve_folder(&drive, "DockerBackups").await;
        assert!(matches!(result, Err(BackupError::Backend(_))));
    }

    #[tokio::test]
    async fn test_listing_failure_does_not_create() {
        let drive = MemoryDrive::new().fail_listing();

        let result = resolve_folder(&drive, "DockerBackups").await;
        assert!(matches!(result, Err(BackupError::Backend(_))));
        assert_eq!(drive.folders_created(), 0);
    }
}
