//! Runtime settings derived from scalar configuration options
//!
//! Options are read once after the environment is loaded and threaded through
//! constructors; nothing downstream looks options up by name again.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::environment::Environment;
use crate::constants::{archives, ftp};
use crate::errors::{ConfigError, ConfigResult};

/// How FTP directory contents are listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FtpListing {
    /// `NLST`: plain names
    #[default]
    Nlst,
    /// `LIST`: detailed lines, the name is the last token
    List,
}

/// FTP connection parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtpConfig {
    /// Server host name
    pub host: String,
    /// Control port
    pub port: u16,
    /// Listing command
    pub listing: FtpListing,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            host: ftp::DEFAULT_HOST.to_string(),
            port: ftp::DEFAULT_PORT,
            listing: FtpListing::default(),
        }
    }
}

/// External archive tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Tool executable, absolute or looked up on `PATH`
    pub program: PathBuf,
    /// Extract-mode argument
    pub extract_flag: String,
    /// Prefix glued to the output directory
    pub output_flag: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(archives::DEFAULT_EXTRACT_EXE),
            extract_flag: archives::DEFAULT_EXTRACT_FLAG.to_string(),
            output_flag: archives::DEFAULT_OUTPUT_FLAG.to_string(),
        }
    }
}

/// Settings for listing, fetching and launching
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSettings {
    /// Remove archives after successful extraction
    pub delete_zip: bool,
    /// Archive tool
    pub extractor: ExtractorConfig,
    /// FTP source
    pub ftp: FtpConfig,
    /// Optional per-task deadline
    pub task_timeout: Option<Duration>,
    /// Working directory for launched processes
    pub start_in: Option<PathBuf>,
}

impl UpdateSettings {
    /// Read settings from the environment's scalar options
    pub fn from_environment(env: &Environment) -> ConfigResult<Self> {
        let defaults = Self::default();

        let extractor = ExtractorConfig {
            program: string_option(env, "extract_exe")?
                .map(PathBuf::from)
                .unwrap_or(defaults.extractor.program),
            extract_flag: string_option(env, "extract_flag")?
                .unwrap_or(defaults.extractor.extract_flag),
            output_flag: string_option(env, "output_flag")?
                .unwrap_or(defaults.extractor.output_flag),
        };

        let listing = match string_option(env, "ftp_listing")?.as_deref() {
            None => FtpListing::default(),
            Some(s) if s.eq_ignore_ascii_case("nlst") => FtpListing::Nlst,
            Some(s) if s.eq_ignore_ascii_case("list") => FtpListing::List,
            Some(other) => {
                return Err(ConfigError::InvalidOption {
                    name: "ftp_listing".to_string(),
                    reason: format!("expected \"nlst\" or \"list\", got {other:?}"),
                })
            }
        };

        let port = match u64_option(env, "ftp_port")? {
            None => defaults.ftp.port,
            Some(port) => u16::try_from(port).map_err(|_| ConfigError::InvalidOption {
                name: "ftp_port".to_string(),
                reason: format!("{port} is not a valid port"),
            })?,
        };

        Ok(Self {
            delete_zip: bool_option(env, "delete_zip")?.unwrap_or(defaults.delete_zip),
            extractor,
            ftp: FtpConfig {
                host: string_option(env, "ftp_host")?.unwrap_or(defaults.ftp.host),
                port,
                listing,
            },
            task_timeout: u64_option(env, "task_timeout_secs")?
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            start_in: string_option(env, "start_in")?
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        })
    }
}

fn invalid(name: &str, expected: &str, value: &Value) -> ConfigError {
    ConfigError::InvalidOption {
        name: name.to_string(),
        reason: format!("expected {expected}, got {value}"),
    }
}

fn string_option(env: &Environment, name: &str) -> ConfigResult<Option<String>> {
    match env.option(name)? {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(invalid(name, "a string", other)),
    }
}

fn bool_option(env: &Environment, name: &str) -> ConfigResult<Option<bool>> {
    match env.option(name)? {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(invalid(name, "true or false", other)),
    }
}

fn u64_option(env: &Environment, name: &str) -> ConfigResult<Option<u64>> {
    match env.option(name)? {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| invalid(name, "a non-negative integer", value)),
    }
}
