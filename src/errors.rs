//! Error types for NX Tools
//!
//! Each component has its own error enum so callers can react to the kind of
//! failure (a broken configuration aborts, a missing remote only skips one
//! branch, a failed transfer becomes a task result). `AppError` ties them
//! together for the CLI.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No configuration documents were supplied
    #[error("Must supply at least one configuration document")]
    NoDocuments,

    /// Configuration document not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Document could not be read
    #[error("Could not read configuration {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid JSON
    #[error("Invalid configuration {path}\n{reason}")]
    InvalidJson { path: PathBuf, reason: String },

    /// Document (or merged result) is not a JSON object
    #[error("Invalid configuration: {what} must be a JSON object")]
    NotAnObject { what: String },

    /// A required project key is missing
    #[error("Invalid configuration: missing project key {key}")]
    MissingProject { key: String },

    /// A template references a variable that was never defined
    #[error("Invalid configuration: undefined variable {var} in {project} branch {version}")]
    UndefinedVariable {
        var: String,
        project: String,
        version: String,
    },

    /// Template text is malformed (unbalanced braces)
    #[error("Invalid configuration: malformed template {template:?}: {reason}")]
    MalformedTemplate { template: String, reason: String },

    /// A template variable has a non-scalar value
    #[error("Invalid configuration: variable {var} must be a string or a number")]
    InvalidVariable { var: String },

    /// A branch has no local location and the project has no target rule
    #[error("Invalid configuration: {project} branch {version} has no local location. Must use a \"target_rule\"")]
    MissingTargetRule { project: String, version: String },

    /// Comma-split keys collide with each other or with an existing key
    #[error("Invalid configuration: duplicate {project} version key {key}")]
    DuplicateKey { project: String, key: String },

    /// A branch entry does not have the `[remote, local?]` shape
    #[error("Invalid configuration: {project} branch {version}: {reason}")]
    InvalidBranch {
        project: String,
        version: String,
        reason: String,
    },

    /// Project keys must be accessed through branch lookups
    #[error("{name} is a project. Use branch lookups instead")]
    ProjectOption { name: String },

    /// Unknown scalar option
    #[error("Configuration has no {name} entry")]
    UnknownOption { name: String },

    /// Scalar option with the wrong type or an unusable value
    #[error("Invalid configuration value for {name}: {reason}")]
    InvalidOption { name: String, reason: String },

    /// Could not determine where configuration lives
    #[error("Could not determine user config directory")]
    NoConfigDir,
}

impl ConfigError {
    /// Whether this is the "document does not exist" case
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::NotFound { .. })
    }
}

/// Branch lookup errors
#[derive(Error, Debug)]
pub enum BranchError {
    /// Unknown project name
    #[error("Unknown project {name}. Expected one of: nx, tmg")]
    UnknownProject { name: String },

    /// No configured version matches the request
    #[error("Could not find a {project} branch for {version}\nAvailable: {}", .available.join(" "))]
    NoMatch {
        project: String,
        version: String,
        available: Vec<String>,
    },

    /// Several configured versions are prefixes of the request
    #[error("Ambiguous. Found {} matches for {version} in {project}: {}", .matches.len(), .matches.join(", "))]
    Ambiguous {
        project: String,
        version: String,
        matches: Vec<String>,
    },
}

/// Remote listing errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Remote directory does not exist
    #[error("Remote directory does not exist: {path}")]
    RemoteNotFound { path: String },

    /// Could not reach or talk to the FTP server
    #[error("FTP connection error:\n{reason}")]
    Ftp { reason: String },

    /// File system error while listing
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Branch has no remote to list
    #[error("Branch has no remote location")]
    NoRemote,

    /// Selected indices do not refer to listed items
    #[error("Invalid IDs for tasks: {} (available: 0..{available})", .indices.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", "))]
    InvalidSelection { indices: Vec<usize>, available: usize },

    /// Blocking listing job failed to complete
    #[error("Listing job failed: {reason}")]
    Join { reason: String },
}

/// Known failures of a fetch task
///
/// These are surfaced to the user verbatim as the task result reason.
#[derive(Error, Debug)]
pub enum TaskError {
    /// Copy or FTP retrieval failed
    #[error("Could not fetch {item} to {}\n{reason}", .destination.display())]
    Transfer {
        item: String,
        destination: PathBuf,
        reason: String,
    },

    /// Archive is not where extraction expects it
    #[error("Archive does not exist: {}", .path.display())]
    ArchiveMissing { path: PathBuf },

    /// Extraction tool could not be found or started
    #[error("Could not find archive tool at {tool}")]
    ToolNotFound { tool: String },

    /// Extraction tool exited with a non-zero status
    #[error("Could not extract {} successfully.\n{stderr}", .archive.display())]
    Extraction { archive: PathBuf, stderr: String },

    /// Task exceeded the configured deadline
    #[error("Timed out after {:.1} seconds", .limit.as_secs_f64())]
    Timeout { limit: Duration },
}

/// Launch history file errors
#[derive(Error, Debug)]
pub enum HistoryError {
    /// History file exists but could not be read or written
    #[error("Could not access history file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// History file is not in the expected format
    #[error("Corrupt history file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Branch resolution error
    #[error(transparent)]
    Branch(#[from] BranchError),

    /// Listing error
    #[error(transparent)]
    Source(#[from] SourceError),

    /// History error
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("{message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (the user can fix it and retry)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Config(ConfigError::NotFound { .. })
            | AppError::Branch(_)
            | AppError::Source(SourceError::Ftp { .. })
            | AppError::Source(SourceError::RemoteNotFound { .. })
            | AppError::Source(SourceError::InvalidSelection { .. }) => true,

            AppError::Config(_) => false,

            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Branch(_) => "branch",
            AppError::Source(_) => "source",
            AppError::History(_) => "history",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Branch result type alias
pub type BranchResult<T> = std::result::Result<T, BranchError>;

/// Listing result type alias
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Task result type alias
pub type TaskErrorResult<T> = std::result::Result<T, TaskError>;

/// History result type alias
pub type HistoryResult<T> = std::result::Result<T, HistoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_names_all_matches() {
        let err = BranchError::Ambiguous {
            project: "tmg".to_string(),
            version: "nx901".to_string(),
            matches: vec!["nx9".to_string(), "nx90".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 matches"));
        assert!(msg.contains("nx9,"));
        assert!(msg.contains("nx90"));
    }

    #[test]
    fn test_no_match_lists_available() {
        let err = BranchError::NoMatch {
            project: "nx".to_string(),
            version: "nx10".to_string(),
            available: vec!["nx9".to_string(), "nx11".to_string()],
        };
        assert!(err.to_string().ends_with("Available: nx9 nx11"));
    }

    #[test]
    fn test_invalid_selection_message() {
        let err = SourceError::InvalidSelection {
            indices: vec![4, 7],
            available: 3,
        };
        assert!(err.to_string().starts_with("Invalid IDs for tasks: 4, 7"));
    }

    #[test]
    fn test_categories() {
        let err = AppError::from(ConfigError::MissingProject {
            key: "nx".to_string(),
        });
        assert_eq!(err.category(), "config");
        assert!(!err.is_recoverable());

        let err = AppError::from(ConfigError::NotFound {
            path: PathBuf::from("user.json"),
        });
        assert!(err.is_recoverable());
        assert_eq!(AppError::generic("boom").category(), "generic");
    }
}
