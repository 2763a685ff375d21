//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `headline_ingest` library that handles:
//! - Command-line argument parsing
//! - Configuration file loading
//! - Logger initialization
//! - User-facing output formatting and exit codes
//!
//! All core functionality is implemented in the library crate.

use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use headline_ingest::initialization::init_logger_with;
use headline_ingest::{run_ingest, Cli, Config, PipelineAbort};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("headline_ingest: {e}");
            process::exit(2);
        }
    };

    match run_ingest(config).await {
        Ok(report) => {
            println!(
                "Stored {} headline{} from {} source{} ({} failed) in {:.1}s",
                report.pipeline.rows_committed,
                if report.pipeline.rows_committed == 1 { "" } else { "s" },
                report.pipeline.sources_total,
                if report.pipeline.sources_total == 1 { "" } else { "s" },
                report.pipeline.sources_failed,
                report.elapsed_seconds
            );
            if let Some(database) = report.database {
                println!(
                    "Database {} now holds {} records from {} sources",
                    report.db_path.display(),
                    database.total_records,
                    database.total_sources
                );
            }
            Ok(())
        }
        Err(e) => {
            match e.downcast_ref::<PipelineAbort>() {
                Some(abort) => {
                    eprintln!("headline_ingest: run aborted: {:#}", e);
                    eprintln!(
                        "{} record(s) were not written; affected sources: {}",
                        abort.unwritten_records(),
                        abort.affected_sources().join(", ")
                    );
                }
                None => eprintln!("headline_ingest error: {:#}", e),
            }
            process::exit(1);
        }
    }
}
