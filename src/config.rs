//! Application paths and first-run initialization
//!
//! All state lives in one directory: `$NX_TOOLS_HOME` when set, otherwise
//! `<user config dir>/nx_tools`. It holds the materialized default document,
//! the optional user document and the launch history.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::constants::{env, files};
use crate::errors::{AppError, ConfigError, Result};

/// Default configuration document shipped with the binary
pub const DEFAULT_CONFIG: &str = include_str!("../data/default_config.json");

/// Starting point written by `config reset`
const USER_CONFIG_TEMPLATE: &str = r#"{
    // Entries here override default_config.json.
    // Example:
    //   "delete_zip": true,
    //   "nx": {"nx12": ["\\buildshare\nx12"]}
}
"#;

/// Locations of the configuration documents and state files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    /// Paths below an explicit root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Paths for the current user
    pub fn discover() -> Result<Self> {
        if let Some(root) = std::env::var_os(env::HOME_OVERRIDE).filter(|v| !v.is_empty()) {
            debug!("Using {} override", env::HOME_OVERRIDE);
            return Ok(Self::new(root));
        }
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::new(config_dir.join(files::APP_DIR_NAME)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn default_config(&self) -> PathBuf {
        self.root.join(files::DEFAULT_CONFIG_FILE)
    }

    pub fn user_config(&self) -> PathBuf {
        self.root.join(files::USER_CONFIG_FILE)
    }

    pub fn history(&self) -> PathBuf {
        self.root.join(files::HISTORY_FILE)
    }

    /// Write the shipped default document when missing or outdated
    ///
    /// Returns the path when the file was (re)written.
    pub async fn initialize_first_run(&self) -> Result<Option<PathBuf>> {
        let path = self.default_config();

        match tokio::fs::read_to_string(&path).await {
            Ok(current) if current == DEFAULT_CONFIG => return Ok(None),
            Ok(_) => info!("Refreshing default configuration {}", path.display()),
            Err(_) => info!("Creating default configuration {}", path.display()),
        }

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::generic(format!(
                "Failed to create config directory {}: {}",
                self.root.display(),
                e
            ))
        })?;
        tokio::fs::write(&path, DEFAULT_CONFIG).await.map_err(|e| {
            AppError::generic(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Some(path))
    }

    /// Documents to load, defaults first
    ///
    /// An explicit document must exist; the standard user document is used
    /// only when present.
    pub async fn document_paths(&self, explicit: Option<&Path>) -> Result<Vec<PathBuf>> {
        let mut paths = vec![self.default_config()];
        match explicit {
            Some(path) => {
                if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    }
                    .into());
                }
                paths.push(path.to_path_buf());
            }
            None => {
                let user = self.user_config();
                if tokio::fs::try_exists(&user).await.unwrap_or(false) {
                    paths.push(user);
                } else {
                    debug!("No user configuration at {}", user.display());
                }
            }
        }
        Ok(paths)
    }

    /// Replace the user document with an empty template, keeping a backup
    ///
    /// Returns the backup path when a previous document existed.
    pub async fn reset_user_config(&self) -> Result<Option<PathBuf>> {
        let user = self.user_config();
        tokio::fs::create_dir_all(&self.root).await?;

        let backup = if tokio::fs::try_exists(&user).await.unwrap_or(false) {
            let mut name = user.clone().into_os_string();
            name.push(files::BACKUP_FILE_SUFFIX);
            let backup = PathBuf::from(name);
            tokio::fs::rename(&user, &backup).await?;
            Some(backup)
        } else {
            None
        };

        tokio::fs::write(&user, USER_CONFIG_TEMPLATE).await?;
        info!("Reset user configuration {}", user.display());
        Ok(backup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::environment::{Environment, ProjectKey};
    use crate::app::settings::UpdateSettings;
    use tempfile::TempDir;

    #[test]
    fn test_paths_below_root() {
        let paths = AppPaths::new("/state");
        assert_eq!(paths.default_config(), PathBuf::from("/state/default_config.json"));
        assert_eq!(paths.user_config(), PathBuf::from("/state/nx_tools.json"));
        assert_eq!(paths.history(), PathBuf::from("/state/history.json"));
    }

    #[tokio::test]
    async fn test_shipped_defaults_are_valid() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AppPaths::new(temp_dir.path());
        assert!(paths.initialize_first_run().await.unwrap().is_some());
        assert!(paths.initialize_first_run().await.unwrap().is_none());

        let docs = paths.document_paths(None).await.unwrap();
        assert_eq!(docs, vec![paths.default_config()]);

        let env = Environment::load(&docs).await.unwrap();
        let build = env.get_branch(ProjectKey::Nx, "nx1102").unwrap();
        assert_eq!(build.remote.as_deref(), Some(r"\\plmshare\nx_builds\nx11"));
        assert_eq!(build.local, Some(PathBuf::from(r"D:\NX\builds\nx11")));
        assert!(env.get_branch(ProjectKey::Tmg, "nx1101").unwrap().is_tracked());

        let settings = UpdateSettings::from_environment(&env).unwrap();
        assert!(!settings.delete_zip);
        assert_eq!(settings.task_timeout, None);
    }

    #[tokio::test]
    async fn test_explicit_document_must_exist() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AppPaths::new(temp_dir.path());
        let missing = temp_dir.path().join("other.json");
        let err = paths.document_paths(Some(&missing)).await.unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_reset_keeps_backup() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AppPaths::new(temp_dir.path());
        paths.initialize_first_run().await.unwrap();

        assert!(paths.reset_user_config().await.unwrap().is_none());
        tokio::fs::write(paths.user_config(), r#"{"delete_zip": true}"#)
            .await
            .unwrap();
        let backup = paths.reset_user_config().await.unwrap().unwrap();
        assert_eq!(
            tokio::fs::read_to_string(&backup).await.unwrap(),
            r#"{"delete_zip": true}"#
        );

        // the template is a valid, empty overlay
        let docs = paths.document_paths(None).await.unwrap();
        assert_eq!(docs.len(), 2);
        let env = Environment::load(&docs).await.unwrap();
        assert_eq!(env.get_option("delete_zip").unwrap(), &serde_json::json!(false));
    }
}
