//! Prelude module for NX Tools
//!
//! Re-exports the items needed to resolve a branch, list and fetch its new
//! items with a single `use nx_tools::prelude::*;` statement.

pub use crate::errors::{AppError, Result};

pub use crate::app::{
    Branch, BranchStatus, Environment, FetchTask, ProjectKey, Task, TaskResult, TaskScheduler,
    TaskStatus, UpdateSettings, Updater,
};
pub use crate::config::AppPaths;

pub use crate::constants::MAX_WORKERS;

pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;
