//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (defaults, timeouts, retry parameters)
//! - CLI option types and the JSON configuration file shape
//! - Loading and validation of the resolved `Config`

mod constants;
mod file;
mod types;

// Re-export all constants
pub use constants::*;
pub use file::read_file_config;
pub use types::{
    ClassifierConfig, Cli, Config, FileConfig, LogFormat, LogLevel, LowConfidencePolicy,
    SourceConfig,
};
