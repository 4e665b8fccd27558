//! Fetch tasks and their results
//!
//! A [`FetchTask`] transfers one remote item into the local root, extracts it
//! into a sibling directory and optionally deletes the archive. Running a task
//! never returns an error: every outcome is captured in a [`TaskResult`].

pub mod extract;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::source::Transfer;
use crate::constants::workers;
use crate::errors::TaskError;

pub use extract::Extractor;

/// Outcome classification of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Fetched and extracted
    Success,
    /// Known failure; the reason is safe to show as-is
    Failure,
    /// Unanticipated failure; details are only in the log
    UnexpectedError,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failure => "FAIL",
            TaskStatus::UnexpectedError => "ASSERT",
        };
        f.write_str(s)
    }
}

/// Result of one submitted task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskResult {
    /// Id of the task that produced this result
    pub id: String,
    /// Outcome
    pub status: TaskStatus,
    /// Failure reason, absent on success
    pub reason: Option<String>,
}

impl TaskResult {
    pub fn success(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus::Success,
            reason: None,
        }
    }

    pub fn failure(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus::Failure,
            reason: Some(reason.into()),
        }
    }

    pub fn unexpected(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus::UnexpectedError,
            reason: Some(workers::UNEXPECTED_REASON.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}

/// Unit of work run by the scheduler
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Unique id within one submission
    fn id(&self) -> &str;

    /// Run to completion, capturing every failure in the result
    async fn run(&self) -> TaskResult;
}

/// Fetch, extract and optionally delete one archive
#[derive(Debug, Clone)]
pub struct FetchTask {
    id: String,
    local_dir: PathBuf,
    remote_dir: String,
    item: String,
    delete_after: bool,
    transfer: Arc<dyn Transfer>,
    extractor: Extractor,
    timeout: Option<Duration>,
}

impl FetchTask {
    pub fn new(
        id: impl Into<String>,
        local_dir: impl Into<PathBuf>,
        remote_dir: impl Into<String>,
        item: impl Into<String>,
        delete_after: bool,
        transfer: Arc<dyn Transfer>,
        extractor: Extractor,
    ) -> Self {
        Self {
            id: id.into(),
            local_dir: local_dir.into(),
            remote_dir: remote_dir.into(),
            item: item.into(),
            delete_after,
            transfer,
            extractor,
            timeout: None,
        }
    }

    /// Fail the task with a timeout if it takes longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn item(&self) -> &str {
        &self.item
    }

    /// Where the archive is written
    pub fn destination(&self) -> PathBuf {
        self.local_dir.join(&self.item)
    }

    async fn execute(&self) -> anyhow::Result<()> {
        let dest = self.destination();

        debug!("Fetching {} to {}.", self.item, dest.display());
        self.transfer.fetch(&self.item, &dest).await?;
        debug!("Fetch to {} complete.", dest.display());

        self.extractor.extract(&dest).await?;

        if self.delete_after {
            debug!("Deleting archive: {}", dest.display());
            tokio::fs::remove_file(&dest)
                .await
                .with_context(|| format!("Could not delete archive {}", dest.display()))?;
        }
        Ok(())
    }

    async fn execute_with_deadline(&self) -> anyhow::Result<()> {
        let Some(limit) = self.timeout else {
            return self.execute().await;
        };
        match tokio::time::timeout(limit, self.execute()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                self.discard_partial().await;
                Err(TaskError::Timeout { limit }.into())
            }
        }
    }

    /// Remove the archive and extraction directory of an abandoned run
    async fn discard_partial(&self) {
        let dest = self.destination();
        if let Err(e) = tokio::fs::remove_file(&dest).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove partial archive {}: {}", dest.display(), e);
            }
        }
        let output_dir = Extractor::output_dir(&dest);
        if let Err(e) = tokio::fs::remove_dir_all(&output_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove partial output {}: {}", output_dir.display(), e);
            }
        }
    }
}

impl fmt::Display for FetchTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}< Local: {} - Remote: {} - Item: {} >",
            self.id,
            self.local_dir.display(),
            self.remote_dir,
            self.item
        )
    }
}

#[async_trait]
impl Task for FetchTask {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self) -> TaskResult {
        info!("Starting task {}", self);
        match self.execute_with_deadline().await {
            Ok(()) => {
                info!("Task {} complete", self.id);
                TaskResult::success(&self.id)
            }
            Err(e) => match e.downcast::<TaskError>() {
                Ok(known) => {
                    warn!("Task {} failed: {}", self.id, known);
                    TaskResult::failure(&self.id, known.to_string())
                }
                Err(other) => {
                    error!("Task encountered an unexpected error.\n{}", self);
                    error!("{:?}", other);
                    TaskResult::unexpected(&self.id)
                }
            },
        }
    }
}
