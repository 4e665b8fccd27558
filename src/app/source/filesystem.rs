//! Filesystem-backed source (shared drive holding build archives)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{copy_until_cancelled, CancelOnDrop, Listing, Transfer};
use crate::errors::{SourceError, SourceResult, TaskError, TaskErrorResult};

/// Directory of archives matching one extension
#[derive(Debug, Clone)]
pub struct FilesystemSource {
    remote_dir: PathBuf,
    extension: String,
}

impl FilesystemSource {
    /// Source listing `*.{extension}` files directly inside `remote_dir`
    pub fn new(remote_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            remote_dir: remote_dir.into(),
            extension: extension.into(),
        }
    }

    fn matches_extension(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .is_some_and(|ext| ext.to_string_lossy() == self.extension)
    }
}

#[async_trait]
impl Listing for FilesystemSource {
    async fn list_items(&self) -> SourceResult<Vec<String>> {
        if !tokio::fs::try_exists(&self.remote_dir).await.unwrap_or(false) {
            return Err(SourceError::RemoteNotFound {
                path: self.remote_dir.display().to_string(),
            });
        }

        let io_err = |source| SourceError::Io {
            path: self.remote_dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.remote_dir).await.map_err(io_err)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let file_type = entry.file_type().await.map_err(io_err)?;
            if file_type.is_file() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();
        debug!(
            "Remote {} contains:\n{}",
            self.remote_dir.display(),
            files.join("\n")
        );

        files.retain(|name| self.matches_extension(name));
        Ok(files)
    }
}

#[async_trait]
impl Transfer for FilesystemSource {
    async fn fetch(&self, item: &str, destination: &Path) -> TaskErrorResult<()> {
        let source = self.remote_dir.join(item);
        let dest = destination.to_path_buf();
        debug!("Copying {} to {}", source.display(), dest.display());

        let (_guard, cancelled) = CancelOnDrop::new();
        let outcome = tokio::task::spawn_blocking(move || -> std::io::Result<u64> {
            let mut reader = std::fs::File::open(&source)?;
            let copied = std::fs::File::create(&dest)
                .and_then(|mut file| copy_until_cancelled(&mut reader, &mut file, &cancelled));
            if copied.is_err() {
                let _ = std::fs::remove_file(&dest);
            }
            copied
        })
        .await;

        let reason = match outcome {
            Ok(Ok(bytes)) => {
                debug!("Copied {} ({} bytes)", item, bytes);
                return Ok(());
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };
        Err(TaskError::Transfer {
            item: item.to_string(),
            destination: destination.to_path_buf(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lists_matching_files_only() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for name in ["b.7z", "a.7z", "notes.txt", "c.7z.part"] {
            tokio::fs::write(root.join(name), b"x").await.unwrap();
        }
        tokio::fs::create_dir(root.join("dir.7z")).await.unwrap();

        let source = FilesystemSource::new(root, "7z");
        assert_eq!(source.list_items().await.unwrap(), vec!["a.7z", "b.7z"]);
    }

    #[tokio::test]
    async fn test_missing_remote() {
        let temp_dir = TempDir::new().unwrap();
        let source = FilesystemSource::new(temp_dir.path().join("gone"), "7z");
        let err = source.list_items().await.unwrap_err();
        assert!(matches!(err, SourceError::RemoteNotFound { .. }));
    }

    #[tokio::test]
    async fn test_fetch_copies_bytes() {
        let remote = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();
        tokio::fs::write(remote.path().join("nx.7z"), b"archive")
            .await
            .unwrap();

        let source = FilesystemSource::new(remote.path(), "7z");
        let dest = local.path().join("nx.7z");
        source.fetch("nx.7z", &dest).await.unwrap();
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"archive");
    }

    #[tokio::test]
    async fn test_fetch_missing_item_is_transfer_error() {
        let remote = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();
        let source = FilesystemSource::new(remote.path(), "7z");

        let err = source
            .fetch("absent.7z", &local.path().join("absent.7z"))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Transfer { .. }));
        assert!(err.to_string().contains("absent.7z"));
    }
}
