//! Main application modules.
//!
//! This module provides the end-of-run reporting used by the run module and
//! the binary.

pub mod statistics;

// Re-export public API
pub use statistics::{print_database_statistics, print_error_statistics, print_run_summary};
