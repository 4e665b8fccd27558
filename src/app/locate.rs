//! Locating installed builds and patches on disk

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use walkdir::WalkDir;

use crate::constants::launch;

/// Extracted build or patch directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalItem {
    pub path: PathBuf,
    pub modified: DateTime<Local>,
}

impl LocalItem {
    /// Directory name, or the full path when `absolute`
    pub fn display_name(&self, absolute: bool) -> String {
        if absolute {
            return self.path.display().to_string();
        }
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Subdirectories of `root`, most recently modified first
///
/// A missing root has no items.
pub fn list_directories(root: &Path) -> std::io::Result<Vec<LocalItem>> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut items = Vec::new();
    for entry in entries {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_dir() {
            continue;
        }
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        items.push(LocalItem {
            path: entry.path(),
            modified: DateTime::<Local>::from(modified),
        });
    }
    items.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)));
    Ok(items)
}

/// First `ugraf.exe` below a build root
pub fn find_ugraf(build_root: &Path) -> Option<PathBuf> {
    WalkDir::new(build_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_type().is_file() && entry.file_name() == launch::UGRAF_EXE)
        .map(|entry| entry.into_path())
}

/// First directory below a patch root holding `exe/MayaMonitor.exe`
pub fn find_tmg(patch_root: &Path) -> Option<PathBuf> {
    let [exe_dir, monitor] = launch::TMG_MONITOR;
    WalkDir::new(patch_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .find(|entry| entry.path().join(exe_dir).join(monitor).is_file())
        .map(|entry| entry.into_path())
}
