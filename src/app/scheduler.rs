//! Bounded-concurrency task scheduler
//!
//! Tasks go into a shared queue drained by a fixed number of workers. Each
//! worker sends one [`TaskResult`] per task over a channel as soon as the task
//! finishes, so results arrive in completion order. A task that panics is
//! reported as an unexpected error and never takes its worker down.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

use super::task::{Task, TaskResult};
use crate::constants::workers;

/// Runs tasks on a fixed-size worker pool
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    worker_count: usize,
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self {
            worker_count: workers::MAX_WORKERS,
        }
    }
}

impl TaskScheduler {
    /// Scheduler with `worker_count` workers (at least one)
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
        }
    }

    /// Single worker: tasks run one after another
    pub fn sequential() -> Self {
        Self::new(1)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Start running `tasks`, returning their results as they complete
    ///
    /// The returned stream yields exactly one result per task and ends once
    /// every task has reported. Must be called within a tokio runtime.
    pub fn submit<T, I>(&self, tasks: I) -> TaskResults
    where
        T: Task,
        I: IntoIterator<Item = T>,
    {
        let queue: VecDeque<Arc<T>> = tasks.into_iter().map(Arc::new).collect();
        let total = queue.len();
        let (tx, rx) = mpsc::channel(total.max(1));
        let queue = Arc::new(Mutex::new(queue));

        let worker_count = self.worker_count.min(total);
        debug!("Submitting {} tasks to {} workers", total, worker_count);

        for worker_id in 0..worker_count {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            tokio::spawn(async move {
                loop {
                    let Some(task) = queue.lock().await.pop_front() else {
                        break;
                    };
                    let result = run_isolated(worker_id, task).await;
                    if tx.send(result).await.is_err() {
                        debug!("Worker {} stopping, results no longer consumed", worker_id);
                        break;
                    }
                }
            });
        }

        TaskResults { rx, total }
    }
}

async fn run_isolated<T: Task>(worker_id: usize, task: Arc<T>) -> TaskResult {
    let id = task.id().to_string();
    debug!("Worker {} running task {}", worker_id, id);

    let handle = tokio::spawn(async move { task.run().await });
    match handle.await {
        Ok(result) => result,
        Err(e) => {
            error!("Task {} aborted: {:?}", id, e);
            TaskResult::unexpected(id)
        }
    }
}

/// Results of one submission in completion order
#[derive(Debug)]
pub struct TaskResults {
    rx: mpsc::Receiver<TaskResult>,
    total: usize,
}

impl TaskResults {
    /// Number of submitted tasks
    pub fn total(&self) -> usize {
        self.total
    }

    /// Next finished result, `None` once all tasks have reported
    pub async fn next_result(&mut self) -> Option<TaskResult> {
        self.rx.recv().await
    }
}

impl Stream for TaskResults {
    type Item = TaskResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
