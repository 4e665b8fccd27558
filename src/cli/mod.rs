//! Command-line interface components
//!
//! This module contains CLI-specific code for NX Tools, including argument
//! parsing, command handlers and interactive prompts.

pub mod args;
pub mod commands;
pub mod prompt;

pub use args::{
    Cli, Commands, ConfigAction, ConfigArgs, FindEntryArgs, GlobalArgs, LaunchArgs, ListArgs,
    UpdateArgs, VersionArgs,
};
pub use commands::{
    handle_check, handle_config, handle_find_entry, handle_history, handle_launch, handle_list,
    handle_update, AppContext,
};
