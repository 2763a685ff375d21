//! End-of-run statistics printing.

use log::info;
use strum::IntoEnumIterator;

use crate::error_handling::{ErrorType, InfoType, ProcessingStats, WarningType};
use crate::pipeline::PipelineReport;
use crate::storage::DatabaseStats;

/// Prints a one-line summary of the pipeline run.
pub fn print_run_summary(report: &PipelineReport) {
    info!(
        "Processed {} source{} ({} failed): {} item(s) extracted, {} stored in {} batch(es) in {:.1}s",
        report.sources_total,
        if report.sources_total == 1 { "" } else { "s" },
        report.sources_failed,
        report.items_extracted,
        report.rows_committed,
        report.batches_committed,
        report.elapsed.as_secs_f64()
    );
    if report.low_confidence_kept > 0 || report.low_confidence_dropped > 0 {
        info!(
            "Low-confidence items: {} stored as Uncategorized, {} dropped",
            report.low_confidence_kept, report.low_confidence_dropped
        );
    }
}

/// Prints row counts read back from the database after the run.
pub fn print_database_statistics(stats: &DatabaseStats, pending_batch_size: usize) {
    info!("=== Database Statistics ===");
    info!("Total records: {}", stats.total_records);
    info!("Total sources: {}", stats.total_sources);
    info!("Pending batch size: {}", pending_batch_size);
}

/// Prints error, warning, and info statistics to the log.
pub fn print_error_statistics(error_stats: &ProcessingStats) {
    let total_errors = error_stats.total_errors();
    let total_warnings = error_stats.total_warnings();
    let total_info = error_stats.total_info();

    if total_errors > 0 {
        info!("Error Counts ({} total):", total_errors);
        for error_type in ErrorType::iter() {
            let count = error_stats.get_error_count(error_type);
            if count > 0 {
                info!("   {}: {}", error_type.as_str(), count);
            }
        }
    }

    if total_warnings > 0 {
        info!("Warning Counts ({} total):", total_warnings);
        for warning_type in WarningType::iter() {
            let count = error_stats.get_warning_count(warning_type);
            if count > 0 {
                info!("   {}: {}", warning_type.as_str(), count);
            }
        }
    }

    if total_info > 0 {
        info!("Info Counts ({} total):", total_info);
        for info_type in InfoType::iter() {
            let count = error_stats.get_info_count(info_type);
            if count > 0 {
                info!("   {}: {}", info_type.as_str(), count);
            }
        }
    }
}
