//! New-item discovery and task creation for one branch
//!
//! An item is already handled when a directory named after it (extension
//! stripped) exists under the local root. Whether the archive itself is still
//! there does not matter.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use super::environment::{Branch, ProjectKey};
use super::settings::UpdateSettings;
use super::source::RemoteSource;
use super::task::{Extractor, FetchTask};
use crate::errors::{SourceError, SourceResult};

/// Lists new items of a tracked branch and turns a selection into tasks
#[derive(Debug)]
pub struct Updater {
    project: ProjectKey,
    local_dir: PathBuf,
    remote_dir: String,
    source: RemoteSource,
    extractor: Extractor,
    delete_after: bool,
    timeout: Option<Duration>,
    new_items: Vec<String>,
}

impl Updater {
    pub fn new(
        project: ProjectKey,
        local_dir: impl Into<PathBuf>,
        remote_dir: impl Into<String>,
        source: RemoteSource,
        settings: &UpdateSettings,
    ) -> Self {
        Self {
            project,
            local_dir: local_dir.into(),
            remote_dir: remote_dir.into(),
            source,
            extractor: Extractor::new(settings.extractor.clone()),
            delete_after: settings.delete_zip,
            timeout: settings.task_timeout,
            new_items: Vec::new(),
        }
    }

    /// Updater for a tracked branch using the project's source kind
    pub fn for_branch(
        project: ProjectKey,
        branch: &Branch,
        settings: &UpdateSettings,
    ) -> SourceResult<Self> {
        let (Some(remote), Some(local), true) = (&branch.remote, &branch.local, branch.is_tracked())
        else {
            return Err(SourceError::NoRemote);
        };
        let source = RemoteSource::for_project(project, remote, settings);
        Ok(Self::new(project, local, remote.as_str(), source, settings))
    }

    pub fn project(&self) -> ProjectKey {
        self.project
    }

    pub fn local_dir(&self) -> &Path {
        &self.local_dir
    }

    /// Items found by the last [`list_new`](Self::list_new) call
    pub fn new_items(&self) -> &[String] {
        &self.new_items
    }

    /// List remote items that have not been extracted locally yet
    pub async fn list_new(&mut self) -> SourceResult<&[String]> {
        let items = self.source.listing.list_items().await?;
        debug!("Found items:\n{}", items.join("\n"));

        let mut new_items = Vec::with_capacity(items.len());
        for item in items {
            let new = is_new(&item, &self.local_dir).await;
            debug!("Item {} is new? {}", item, new);
            if new {
                new_items.push(item);
            }
        }
        self.new_items = new_items;
        Ok(&self.new_items)
    }

    /// Build fetch tasks for positions in the last listing
    ///
    /// Returns no tasks when nothing has been listed. Repeated indices yield
    /// one task. Task ids are `<project>-<n>` with `n` counting through the
    /// selection.
    pub async fn make_tasks(&self, indices: &[usize]) -> SourceResult<Vec<FetchTask>> {
        if self.new_items.is_empty() {
            return Ok(Vec::new());
        }

        tokio::fs::create_dir_all(&self.local_dir)
            .await
            .map_err(|source| SourceError::Io {
                path: self.local_dir.clone(),
                source,
            })?;

        let available = self.new_items.len();
        let invalid: Vec<usize> = indices.iter().copied().filter(|&i| i >= available).collect();
        if !invalid.is_empty() {
            return Err(SourceError::InvalidSelection {
                indices: invalid,
                available,
            });
        }

        let mut seen = HashSet::new();
        Ok(indices
            .iter()
            .copied()
            .filter(|&index| seen.insert(index))
            .enumerate()
            .map(|(n, index)| {
                FetchTask::new(
                    format!("{}-{}", self.project, n),
                    &self.local_dir,
                    self.remote_dir.as_str(),
                    self.new_items[index].as_str(),
                    self.delete_after,
                    self.source.transfer.clone(),
                    self.extractor.clone(),
                )
                .with_timeout(self.timeout)
            })
            .collect())
    }
}

/// Whether `item` has no extracted directory under `local_root`
pub async fn is_new(item: &str, local_root: &Path) -> bool {
    let Some(stem) = Path::new(item).file_stem() else {
        return true;
    };
    !tokio::fs::metadata(local_root.join(stem))
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::source::FilesystemSource;
    use crate::app::task::Task;
    use tempfile::TempDir;

    async fn remote_with(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            tokio::fs::write(dir.path().join(name), b"x").await.unwrap();
        }
        dir
    }

    fn updater(remote: &Path, local: &Path) -> Updater {
        Updater::new(
            ProjectKey::Nx,
            local,
            remote.display().to_string(),
            RemoteSource::from_source(FilesystemSource::new(remote, "7z")),
            &UpdateSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_extracted_directory_marks_item_handled() {
        let local = TempDir::new().unwrap();
        tokio::fs::create_dir(local.path().join("foo")).await.unwrap();
        // an archive without its directory is still new
        tokio::fs::write(local.path().join("bar.7z"), b"x").await.unwrap();

        assert!(!is_new("foo.7z", local.path()).await);
        assert!(is_new("bar.7z", local.path()).await);
        assert!(is_new("baz.7z", local.path()).await);
    }

    #[tokio::test]
    async fn test_regular_file_does_not_mark_item_handled() {
        let local = TempDir::new().unwrap();
        tokio::fs::write(local.path().join("foo"), b"x").await.unwrap();
        assert!(is_new("foo.7z", local.path()).await);
    }

    #[tokio::test]
    async fn test_list_new_filters_extracted() {
        let remote = remote_with(&["nx_a.7z", "nx_b.7z", "readme.txt"]).await;
        let local = TempDir::new().unwrap();
        tokio::fs::create_dir(local.path().join("nx_a")).await.unwrap();

        let mut updater = updater(remote.path(), local.path());
        assert_eq!(updater.list_new().await.unwrap(), ["nx_b.7z".to_string()]);
        assert_eq!(updater.new_items(), ["nx_b.7z".to_string()]);
    }

    #[tokio::test]
    async fn test_make_tasks_before_listing_is_empty() {
        let remote = remote_with(&["nx_a.7z"]).await;
        let local = TempDir::new().unwrap();
        let target = local.path().join("builds");

        let updater = updater(remote.path(), &target);
        assert!(updater.make_tasks(&[0]).await.unwrap().is_empty());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_make_tasks_ids_and_local_dir() {
        let remote = remote_with(&["a.7z", "b.7z", "c.7z"]).await;
        let local = TempDir::new().unwrap();
        let target = local.path().join("builds");

        let mut updater = updater(remote.path(), &target);
        updater.list_new().await.unwrap();
        let tasks = updater.make_tasks(&[2, 0]).await.unwrap();

        assert!(target.is_dir());
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id(), "nx-0");
        assert_eq!(tasks[0].item(), "c.7z");
        assert_eq!(tasks[1].id(), "nx-1");
        assert_eq!(tasks[1].item(), "a.7z");
        assert_eq!(tasks[1].destination(), target.join("a.7z"));
    }

    #[tokio::test]
    async fn test_make_tasks_ignores_repeated_indices() {
        let remote = remote_with(&["a.7z", "b.7z"]).await;
        let local = TempDir::new().unwrap();

        let mut updater = updater(remote.path(), local.path());
        updater.list_new().await.unwrap();
        let tasks = updater.make_tasks(&[1, 0, 1, 1]).await.unwrap();

        let items: Vec<&str> = tasks.iter().map(|t| t.item()).collect();
        assert_eq!(items, vec!["b.7z", "a.7z"]);
        assert_eq!(tasks[1].id(), "nx-1");
    }

    #[tokio::test]
    async fn test_make_tasks_rejects_invalid_indices() {
        let remote = remote_with(&["a.7z", "b.7z"]).await;
        let local = TempDir::new().unwrap();

        let mut updater = updater(remote.path(), local.path());
        updater.list_new().await.unwrap();
        let err = updater.make_tasks(&[1, 2, 5]).await.unwrap_err();
        match err {
            SourceError::InvalidSelection { indices, available } => {
                assert_eq!(indices, vec![2, 5]);
                assert_eq!(available, 2);
            }
            other => panic!("expected invalid selection, got {other:?}"),
        }
    }

    #[test]
    fn test_for_branch_requires_tracked() {
        let settings = UpdateSettings::default();
        assert!(Updater::for_branch(ProjectKey::Nx, &Branch::frozen("C:\\nx\\ugraf.exe"), &settings).is_err());
        assert!(Updater::for_branch(ProjectKey::Nx, &Branch::local_only("/builds"), &settings).is_err());
        let updater =
            Updater::for_branch(ProjectKey::Tmg, &Branch::tracked("/pub/tmg", "/patches"), &settings)
                .unwrap();
        assert_eq!(updater.project(), ProjectKey::Tmg);
        assert_eq!(updater.local_dir(), Path::new("/patches"));
    }
}
