//! Core application logic for NX Tools
//!
//! The update pipeline: an [`Environment`] resolves a version to a branch, an
//! [`Updater`] lists the branch's new items and turns a selection into
//! [`FetchTask`]s, and the [`TaskScheduler`] runs them and yields results as
//! they complete.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nx_tools::app::{Environment, ProjectKey, TaskScheduler, UpdateSettings, Updater};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let env = Environment::load(&["default_config.json"]).await?;
//! let settings = UpdateSettings::from_environment(&env)?;
//! let branch = env.get_branch(ProjectKey::Nx, "nx1102")?;
//!
//! let mut updater = Updater::for_branch(ProjectKey::Nx, branch, &settings)?;
//! let count = updater.list_new().await?.len();
//! let tasks = updater.make_tasks(&(0..count).collect::<Vec<_>>()).await?;
//!
//! let mut results = TaskScheduler::default().submit(tasks);
//! while let Some(result) = results.next_result().await {
//!     println!("{}: {}", result.id, result.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod environment;
pub mod history;
pub mod locate;
pub mod scheduler;
pub mod settings;
pub mod source;
pub mod task;
pub mod updater;

// Re-export main public API
pub use environment::{Branch, BranchStatus, Environment, ProjectKey};
pub use history::{History, LaunchRecord};
pub use scheduler::{TaskResults, TaskScheduler};
pub use settings::{ExtractorConfig, FtpConfig, FtpListing, UpdateSettings};
pub use source::{FilesystemSource, FtpSource, Listing, RemoteSource, Transfer};
pub use task::{Extractor, FetchTask, Task, TaskResult, TaskStatus};
pub use updater::{is_new, Updater};
