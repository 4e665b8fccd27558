//! Application constants for NX Tools
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain.

/// Project keys as they appear in configuration documents
pub mod projects {
    /// Build-artifacts project
    pub const NX_KEY: &str = "nx";

    /// Patch-artifacts project
    pub const TMG_KEY: &str = "tmg";

    /// Per-project template used to synthesize missing local locations
    pub const TARGET_RULE_KEY: &str = "target_rule";

    /// Implicit template variable bound to the branch's version key
    pub const VERSION_VAR: &str = "version";
}

/// Worker and concurrency configuration
pub mod workers {
    /// Fixed number of concurrent fetch workers
    pub const MAX_WORKERS: usize = 3;

    /// Reason reported for task failures nobody anticipated
    pub const UNEXPECTED_REASON: &str = "UNEXPECTED ASSERT. CHECK LOG";
}

/// Archive handling
pub mod archives {
    /// Extension of build archives on the shared drive
    pub const BUILD_ARCHIVE_EXTENSION: &str = "7z";

    /// Extension marking a remote as a runnable artifact (frozen branch)
    pub const EXECUTABLE_EXTENSION: &str = ".exe";

    /// Default archive tool (7-Zip command line)
    pub const DEFAULT_EXTRACT_EXE: &str = "7z";

    /// Extract-with-full-paths switch
    pub const DEFAULT_EXTRACT_FLAG: &str = "x";

    /// Output directory switch, value is appended without a separator
    pub const DEFAULT_OUTPUT_FLAG: &str = "-o";

    /// Bytes copied between checks for an abandoned transfer
    pub const COPY_BUFFER_SIZE: usize = 64 * 1024;
}

/// FTP source configuration
pub mod ftp {
    /// Default FTP host name
    pub const DEFAULT_HOST: &str = "ftp";

    /// Default FTP control port
    pub const DEFAULT_PORT: u16 = 21;

    /// Anonymous login user
    pub const ANONYMOUS_USER: &str = "anonymous";

    /// Anonymous login password
    pub const ANONYMOUS_PASSWORD: &str = "anonymous@";

    /// Filename tokens identifying Windows patch archives
    pub const WINDOWS_TOKENS: [&str; 2] = ["wntx64", "win64"];
}

/// Launch support
pub mod launch {
    /// Main NX executable
    pub const UGRAF_EXE: &str = "ugraf.exe";

    /// Marker file locating a TMG installation below a patch root
    pub const TMG_MONITOR: [&str; 2] = ["exe", "MayaMonitor.exe"];

    /// Environment variable NX reads to find the TMG installation
    pub const TMG_ENV_VAR: &str = "UGII_TMG_DIR";

    /// Maximum number of launches kept in the history file
    pub const HISTORY_MAX_RECORDS: u32 = 20;
}

/// File and directory names
pub mod files {
    /// Application directory name below the user config directory
    pub const APP_DIR_NAME: &str = "nx_tools";

    /// Materialized default configuration document
    pub const DEFAULT_CONFIG_FILE: &str = "default_config.json";

    /// User configuration document
    pub const USER_CONFIG_FILE: &str = "nx_tools.json";

    /// Launch history file
    pub const HISTORY_FILE: &str = "history.json";

    /// Backup suffix used when resetting the user configuration
    pub const BACKUP_FILE_SUFFIX: &str = ".bak";
}

/// Exit codes of the scheduled `check` entry point
pub mod exit_codes {
    /// Nothing new
    pub const NOTHING_NEW: i32 = 200;

    /// New build only
    pub const NEW_BUILD: i32 = 201;

    /// New patch only
    pub const NEW_PATCH: i32 = 202;

    /// New build and new patch
    pub const NEW_BOTH: i32 = 203;
}

/// Environment variable names
pub mod env {
    /// Overrides the directory holding configuration and history files
    pub const HOME_OVERRIDE: &str = "NX_TOOLS_HOME";
}

// Re-export commonly used constants at module level for convenience
pub use ftp::DEFAULT_PORT as DEFAULT_FTP_PORT;
pub use workers::MAX_WORKERS;
