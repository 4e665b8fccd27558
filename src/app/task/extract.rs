//! External archive tool invocation

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::debug;

use crate::app::settings::ExtractorConfig;
use crate::errors::{TaskError, TaskErrorResult};

/// Runs the configured archive tool as `tool <extract> <archive> <output><dir>`
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    /// Extractor for the given tool configuration
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Directory an archive extracts into: its path without the extension
    pub fn output_dir(archive: &Path) -> PathBuf {
        archive.with_extension("")
    }

    /// Extract `archive` next to itself, returning the output directory
    pub async fn extract(&self, archive: &Path) -> TaskErrorResult<PathBuf> {
        if !tokio::fs::try_exists(archive).await.unwrap_or(false) {
            return Err(TaskError::ArchiveMissing {
                path: archive.to_path_buf(),
            });
        }

        let tool_not_found = || TaskError::ToolNotFound {
            tool: self.config.program.display().to_string(),
        };
        let program = which::which(&self.config.program).map_err(|_| tool_not_found())?;

        let output_dir = Self::output_dir(archive);
        let mut output_arg = OsString::from(&self.config.output_flag);
        output_arg.push(&output_dir);

        debug!(
            "Extract command: {} {} {} {}",
            program.display(),
            self.config.extract_flag,
            archive.display(),
            output_arg.to_string_lossy()
        );

        let output = tokio::process::Command::new(&program)
            .arg(&self.config.extract_flag)
            .arg(archive)
            .arg(&output_arg)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|_| tool_not_found())?;

        if !output.status.success() {
            let mut stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.is_empty() {
                stderr = String::from_utf8_lossy(&output.stdout).trim().to_string();
            }
            return Err(TaskError::Extraction {
                archive: archive.to_path_buf(),
                stderr,
            });
        }

        debug!("File successfully extracted to: {}", output_dir.display());
        Ok(output_dir)
    }
}
