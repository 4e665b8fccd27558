//! Configuration environment
//!
//! An [`Environment`] is built once from one or more JSON documents (default
//! first, user last) and holds the two projects and their branches plus the
//! flat scalar options. It is immutable after loading.
//!
//! # Vocabulary
//!
//! - **Project**: `nx` (application builds) or `tmg` (patches).
//! - **Branch**: a remote/local location pair for one version of a project.
//! - **Frozen branch**: the remote is the runnable executable itself; it is
//!   never fetched and has no local location.
//! - **Local-only branch**: no remote; only local builds or patches are used.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nx_tools::app::environment::{Environment, ProjectKey};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let env = Environment::load(&["default_config.json", "nx_tools.json"]).await?;
//! let branch = env.get_branch(ProjectKey::Tmg, "nx1003")?;
//! println!("{:?} -> {:?}", branch.remote, branch.local);
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod expand;
pub mod resolve;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::constants::projects;
use crate::errors::{BranchError, BranchResult, ConfigError, ConfigResult};

pub use resolve::resolve_version;

/// The two supported artifact kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKey {
    /// NX application builds, copied from a shared drive
    Nx,
    /// TMG patches, retrieved over FTP
    Tmg,
}

impl ProjectKey {
    /// Both projects, builds first
    pub const ALL: [ProjectKey; 2] = [ProjectKey::Nx, ProjectKey::Tmg];

    /// Key used in configuration documents
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectKey::Nx => projects::NX_KEY,
            ProjectKey::Tmg => projects::TMG_KEY,
        }
    }

    /// Human-readable artifact name
    pub fn artifact(&self) -> &'static str {
        match self {
            ProjectKey::Nx => "build",
            ProjectKey::Tmg => "patch",
        }
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectKey {
    type Err = BranchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            projects::NX_KEY => Ok(ProjectKey::Nx),
            projects::TMG_KEY => Ok(ProjectKey::Tmg),
            _ => Err(BranchError::UnknownProject {
                name: s.to_string(),
            }),
        }
    }
}

/// Branch classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    /// Remote directory that is checked for new items
    Tracked,
    /// Remote is the runnable executable; never fetched
    Frozen,
    /// No remote; local items only
    LocalOnly,
}

impl fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BranchStatus::Tracked => "tracked",
            BranchStatus::Frozen => "frozen",
            BranchStatus::LocalOnly => "local-only",
        };
        f.write_str(s)
    }
}

/// One version of one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    /// Remote directory, FTP path or frozen executable
    pub remote: Option<String>,
    /// Local root holding extracted items
    pub local: Option<PathBuf>,
    /// Classification derived from the locations
    pub status: BranchStatus,
}

impl Branch {
    /// Branch whose remote is the executable itself
    pub fn frozen(remote: impl Into<String>) -> Self {
        Self {
            remote: Some(remote.into()),
            local: None,
            status: BranchStatus::Frozen,
        }
    }

    /// Branch with both a remote and a local location
    pub fn tracked(remote: impl Into<String>, local: impl Into<PathBuf>) -> Self {
        Self {
            remote: Some(remote.into()),
            local: Some(local.into()),
            status: BranchStatus::Tracked,
        }
    }

    /// Branch with only a local location
    pub fn local_only(local: impl Into<PathBuf>) -> Self {
        Self {
            remote: None,
            local: Some(local.into()),
            status: BranchStatus::LocalOnly,
        }
    }

    /// Whether the remote should be checked for new items
    pub fn is_tracked(&self) -> bool {
        self.status == BranchStatus::Tracked
    }

    /// Whether the remote is the runnable executable
    pub fn is_frozen(&self) -> bool {
        self.status == BranchStatus::Frozen
    }
}

/// Parsed and validated configuration
#[derive(Debug, Clone, Serialize)]
pub struct Environment {
    projects: BTreeMap<ProjectKey, BTreeMap<String, Branch>>,
    options: Map<String, Value>,
}

impl Environment {
    /// Load, merge and validate configuration documents
    ///
    /// Later documents take precedence over earlier ones.
    pub async fn load<P: AsRef<Path>>(paths: &[P]) -> ConfigResult<Self> {
        let merged = document::load_merged(paths).await?;
        Self::from_value(Value::Object(merged))
    }

    /// Validate an already merged configuration tree
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        let Value::Object(mut root) = value else {
            return Err(ConfigError::NotAnObject {
                what: "configuration".to_string(),
            });
        };

        let vars = expand::pop_variables(&mut root)?;
        debug!("Template variables: {:?}", vars);

        let mut projects = BTreeMap::new();
        for project in ProjectKey::ALL {
            let raw = root
                .remove(project.as_str())
                .ok_or_else(|| ConfigError::MissingProject {
                    key: project.to_string(),
                })?;
            projects.insert(project, expand::expand_project(project, raw, &vars)?);
        }

        Ok(Self {
            projects,
            options: root,
        })
    }

    /// Look up a branch, falling back to fuzzy resolution
    pub fn get_branch(&self, project: ProjectKey, version: &str) -> BranchResult<&Branch> {
        let key = self.resolve_version(project, version)?;
        let branches = self.branches(project);
        let branch = &branches[key];
        debug!("Resolved {} {} to {}: {:?}", project, version, key, branch);
        Ok(branch)
    }

    /// Resolve a requested version to a configured key of `project`
    pub fn resolve_version(&self, project: ProjectKey, version: &str) -> BranchResult<&str> {
        resolve_version(
            project,
            version,
            self.branches(project).keys().map(String::as_str),
        )
    }

    /// Scalar option outside the project namespaces
    pub fn get_option(&self, name: &str) -> ConfigResult<&Value> {
        if ProjectKey::from_str(name).is_ok() {
            return Err(ConfigError::ProjectOption {
                name: name.to_string(),
            });
        }
        self.options
            .get(name)
            .ok_or_else(|| ConfigError::UnknownOption {
                name: name.to_string(),
            })
    }

    /// Scalar option, `None` when absent or null
    pub fn option(&self, name: &str) -> ConfigResult<Option<&Value>> {
        match self.get_option(name) {
            Ok(Value::Null) => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(ConfigError::UnknownOption { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Configured version keys of a project, sorted
    pub fn list_versions(&self, project: ProjectKey) -> Vec<&str> {
        self.branches(project).keys().map(String::as_str).collect()
    }

    /// All branches of a project
    pub fn branches(&self, project: ProjectKey) -> &BTreeMap<String, Branch> {
        // Both projects are inserted by `from_value`
        &self.projects[&project]
    }

    /// All scalar options
    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }
}
