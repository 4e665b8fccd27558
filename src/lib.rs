//! NX Tools Library
//!
//! Fetches NX application builds and TMG patches from a shared drive or an
//! anonymous FTP server, extracts them concurrently and launches NX with a
//! chosen build/patch pair.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
