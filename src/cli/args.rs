//! Command-line argument parsing for NX Tools
//!
//! This module defines the CLI structure using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// NX Tools - fetch, extract and launch NX builds and TMG patches
#[derive(Parser, Debug)]
#[command(
    name = "nx_tools",
    version,
    about = "Fetch NX builds and TMG patches and launch them",
    long_about = "Checks shared drives and the patch FTP server for new NX builds and TMG patches,
fetches and extracts the selected ones concurrently, and launches NX with a chosen build/patch pair."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// User configuration document overriding the defaults
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch new builds and patches
    Update(UpdateArgs),

    /// Report new builds and patches through the exit code (200-203)
    Check(VersionArgs),

    /// List local builds and patches
    List(ListArgs),

    /// Launch NX with a build and a patch
    Launch(LaunchArgs),

    /// Show recent launches
    History,

    /// Print the build and patch a running NX process was launched with
    #[command(alias = "find_entry")]
    FindEntry(FindEntryArgs),

    /// Inspect or reset configuration
    Config(ConfigArgs),
}

/// Version argument shared by several commands
#[derive(Args, Debug, Clone)]
pub struct VersionArgs {
    /// NX version, e.g. "nx11" or "nx1102"
    pub version: String,
}

/// Arguments for the update command
#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// NX version, e.g. "nx11" or "nx1102"
    pub version: String,

    /// Only update builds
    #[arg(long)]
    pub nx: bool,

    /// Only update patches
    #[arg(long)]
    pub tmg: bool,

    /// Fetch one item at a time
    #[arg(long)]
    pub sync: bool,

    /// Fetch every new item without prompting
    #[arg(short, long)]
    pub all: bool,
}

impl UpdateArgs {
    /// Whether builds are updated (both when neither flag is given)
    pub fn wants_builds(&self) -> bool {
        self.nx || !self.tmg
    }

    /// Whether patches are updated (both when neither flag is given)
    pub fn wants_patches(&self) -> bool {
        self.tmg || !self.nx
    }
}

/// Arguments for the list command
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// NX version, e.g. "nx11" or "nx1102"
    pub version: String,

    /// Only list builds
    #[arg(short, long)]
    pub build: bool,

    /// Only list patches
    #[arg(short, long)]
    pub patch: bool,

    /// Show absolute paths
    #[arg(long)]
    pub absolute: bool,
}

/// Arguments for the launch command
#[derive(Args, Debug, Clone)]
pub struct LaunchArgs {
    /// NX version, e.g. "nx11" or "nx1102"
    pub version: String,

    /// Launch the latest build with the latest patch
    #[arg(long)]
    pub latest: bool,

    /// Use the build's internal TMG
    #[arg(long, conflicts_with = "env_var")]
    pub vanilla: bool,

    /// Keep the current UGII_TMG_DIR environment variable
    #[arg(long)]
    pub env_var: bool,

    /// Alternate version to pick the TMG patch from
    #[arg(long, value_name = "VERSION")]
    pub tmg: Option<String>,

    /// Use the current directory as working directory
    #[arg(long)]
    pub cwd: bool,
}

/// Arguments for the find-entry command
#[derive(Args, Debug, Clone)]
pub struct FindEntryArgs {
    /// Process id of the launched NX session
    pub pid: u32,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the merged configuration
    Show,

    /// Print the configuration document locations
    Path,

    /// Replace the user document with an empty template
    Reset,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}
