//! Anonymous FTP source (patch server)
//!
//! Every listing and every transfer opens its own connection through
//! [`FtpSession`], which logs out when dropped. The FTP client is blocking, so
//! all sessions run on the blocking thread pool; an abandoned `RETR` stops at
//! the next chunk and removes its partial file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tracing::debug;

use super::{copy_until_cancelled, CancelOnDrop, Listing, Transfer};
use crate::app::settings::{FtpConfig, FtpListing};
use crate::constants::ftp;
use crate::errors::{SourceError, SourceResult, TaskError, TaskErrorResult};

/// Remote directory on the configured FTP server
#[derive(Debug, Clone)]
pub struct FtpSource {
    config: FtpConfig,
    remote_dir: String,
}

impl FtpSource {
    /// Source rooted at `remote_dir`
    pub fn new(config: FtpConfig, remote_dir: impl Into<String>) -> Self {
        Self {
            config,
            remote_dir: remote_dir.into(),
        }
    }
}

/// Logged-in connection with the working directory set
struct FtpSession {
    stream: FtpStream,
}

impl FtpSession {
    fn open(config: &FtpConfig, dir: &str) -> Result<Self, FtpError> {
        debug!(
            "Creating FTP connection to {}:{} in directory: {}",
            config.host, config.port, dir
        );
        let stream = FtpStream::connect((config.host.as_str(), config.port))?;
        let mut session = Self { stream };
        session
            .stream
            .login(ftp::ANONYMOUS_USER, ftp::ANONYMOUS_PASSWORD)?;
        session.stream.cwd(dir)?;
        Ok(session)
    }

    fn names(&mut self, listing: FtpListing) -> Result<Vec<String>, FtpError> {
        match listing {
            FtpListing::Nlst => self.stream.nlst(None),
            FtpListing::List => Ok(self
                .stream
                .list(None)?
                .iter()
                .filter_map(|line| listing_name(line))
                .map(str::to_string)
                .collect()),
        }
    }
}

impl Drop for FtpSession {
    fn drop(&mut self) {
        if let Err(e) = self.stream.quit() {
            debug!("FTP quit failed: {}", e);
        }
    }
}

/// File name of one `LIST` line: its last whitespace-delimited token
pub fn listing_name(line: &str) -> Option<&str> {
    line.split_whitespace().last()
}

/// Whether a listed name is a bare file name, safe to join onto the local root
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Whether a patch archive name is a Windows build
pub fn is_windows_item(name: &str) -> bool {
    ftp::WINDOWS_TOKENS.iter().any(|token| name.contains(token))
}

#[async_trait]
impl Listing for FtpSource {
    async fn list_items(&self) -> SourceResult<Vec<String>> {
        let config = self.config.clone();
        let dir = self.remote_dir.clone();

        let names = tokio::task::spawn_blocking(move || {
            let mut session = FtpSession::open(&config, &dir)?;
            session.names(config.listing)
        })
        .await
        .map_err(|e| SourceError::Join {
            reason: e.to_string(),
        })?
        .map_err(|e| SourceError::Ftp {
            reason: e.to_string(),
        })?;

        debug!("FTP Listing:\n{}", names.join("\n"));
        Ok(names
            .into_iter()
            .filter(|name| is_plain_name(name) && is_windows_item(name))
            .collect())
    }
}

#[async_trait]
impl Transfer for FtpSource {
    async fn fetch(&self, item: &str, destination: &Path) -> TaskErrorResult<()> {
        let config = self.config.clone();
        let dir = self.remote_dir.clone();
        let name = item.to_string();
        let dest: PathBuf = destination.to_path_buf();

        let (_guard, cancelled) = CancelOnDrop::new();
        let outcome = tokio::task::spawn_blocking(move || -> Result<u64, String> {
            let mut session = FtpSession::open(&config, &dir).map_err(|e| e.to_string())?;
            session
                .stream
                .transfer_type(FileType::Binary)
                .map_err(|e| e.to_string())?;
            let mut file = std::fs::File::create(&dest).map_err(|e| e.to_string())?;
            let copied = session.stream.retr(&name, |reader| {
                copy_until_cancelled(reader, &mut file, &cancelled).map_err(FtpError::ConnectionError)
            });
            drop(file);
            if copied.is_err() {
                let _ = std::fs::remove_file(&dest);
            }
            copied.map_err(|e| e.to_string())
        })
        .await;

        let transfer_error = |reason: String| TaskError::Transfer {
            item: item.to_string(),
            destination: destination.to_path_buf(),
            reason,
        };
        match outcome {
            Ok(Ok(bytes)) => {
                debug!("Retrieved {} ({} bytes)", item, bytes);
                Ok(())
            }
            Ok(Err(reason)) => Err(transfer_error(format!("FTP connection error:\n{reason}"))),
            Err(e) => Err(transfer_error(e.to_string())),
        }
    }
}
