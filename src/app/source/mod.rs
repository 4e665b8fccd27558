//! Listing and transfer strategies for remote items
//!
//! A branch's remote is either a directory on a local or network filesystem
//! (builds) or a directory on an anonymous FTP server (patches). Both kinds
//! implement [`Listing`] for discovering items and [`Transfer`] for copying one
//! item into a local destination.

pub mod filesystem;
pub mod ftp;

use std::fmt;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::environment::ProjectKey;
use super::settings::UpdateSettings;
use crate::constants::archives;
use crate::errors::{SourceResult, TaskErrorResult};

pub use filesystem::FilesystemSource;
pub use ftp::FtpSource;

/// Enumerates candidate items of a remote location
#[async_trait]
pub trait Listing: Send + Sync + fmt::Debug {
    /// Item identifiers (file names) in a stable order
    async fn list_items(&self) -> SourceResult<Vec<String>>;
}

/// Copies one remote item to a local file
#[async_trait]
pub trait Transfer: Send + Sync + fmt::Debug {
    /// Fetch `item` and write it to `destination`
    async fn fetch(&self, item: &str, destination: &Path) -> TaskErrorResult<()>;
}

/// Flag raised when the future awaiting a blocking transfer is dropped
///
/// A task deadline drops the transfer future, but the blocking job keeps
/// running; it polls the flag through [`copy_until_cancelled`].
#[derive(Debug)]
pub(crate) struct CancelOnDrop(Arc<AtomicBool>);

impl CancelOnDrop {
    pub(crate) fn new() -> (Self, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        (Self(flag.clone()), flag)
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Copy `reader` into `writer`, stopping between chunks once `cancelled` is set
pub(crate) fn copy_until_cancelled<R, W>(
    reader: &mut R,
    writer: &mut W,
    cancelled: &AtomicBool,
) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; archives::COPY_BUFFER_SIZE];
    let mut copied = 0u64;
    loop {
        if cancelled.load(Ordering::Relaxed) {
            return Err(io::Error::other("transfer abandoned"));
        }
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..read])?;
        copied += read as u64;
    }
    writer.flush()?;
    Ok(copied)
}

/// Listing and transfer strategies for one remote location
#[derive(Debug, Clone)]
pub struct RemoteSource {
    /// Item discovery
    pub listing: Arc<dyn Listing>,
    /// Item retrieval
    pub transfer: Arc<dyn Transfer>,
}

impl RemoteSource {
    /// Pair the strategies of a single concrete source
    pub fn from_source<S>(source: S) -> Self
    where
        S: Listing + Transfer + 'static,
    {
        let source = Arc::new(source);
        Self {
            listing: source.clone(),
            transfer: source,
        }
    }

    /// Source kind used by a project
    ///
    /// Builds come from the filesystem as `.7z` archives, patches come from
    /// FTP filtered to Windows archives.
    pub fn for_project(project: ProjectKey, remote: &str, settings: &UpdateSettings) -> Self {
        match project {
            ProjectKey::Nx => Self::from_source(FilesystemSource::new(
                remote,
                archives::BUILD_ARCHIVE_EXTENSION,
            )),
            ProjectKey::Tmg => Self::from_source(FtpSource::new(settings.ftp.clone(), remote)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_until_cancelled_copies_everything() {
        let data = vec![7u8; archives::COPY_BUFFER_SIZE * 2 + 5];
        let mut out = Vec::new();
        let flag = AtomicBool::new(false);
        let copied = copy_until_cancelled(&mut data.as_slice(), &mut out, &flag).unwrap();
        assert_eq!(copied, data.len() as u64);
        assert_eq!(out, data);
    }

    #[test]
    fn test_dropped_guard_stops_copy() {
        let (guard, flag) = CancelOnDrop::new();
        assert!(!flag.load(Ordering::Relaxed));
        drop(guard);

        let mut out = Vec::new();
        let err = copy_until_cancelled(&mut b"payload".as_slice(), &mut out, &flag).unwrap_err();
        assert_eq!(err.to_string(), "transfer abandoned");
        assert!(out.is_empty());
    }
}
