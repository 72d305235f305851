// Run statistics and progress reporting for conversion runs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Number of lines between two progress reports
pub const PROGRESS_INTERVAL_LINES: usize = 10_000;

/// Counters collected while a session consumes its input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub lines_read: usize,
    pub blocks_opened: usize,
    pub blocks_closed: usize,
    pub statements_parsed: usize,
    pub rows_converted: usize,
    /// Lines skipped because they could not be parsed
    pub malformed_lines: usize,
    /// Top-level lines that are not table data
    pub passthrough_lines: usize,
    pub tables_emitted: usize,
}

/// Summary of a finished file conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub input_path: String,
    pub output_path: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stats: ConversionStats,
    /// Row count per emitted target table, in output order
    pub tables: Vec<(String, usize)>,
}

impl ConversionReport {
    pub fn duration_ms(&self) -> i64 {
        self.finished_at
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rows in {} tables ({} malformed lines skipped, {} ms)",
            self.stats.rows_converted,
            self.stats.tables_emitted,
            self.stats.malformed_lines,
            self.duration_ms()
        )
    }
}

/// Progress events raised by a conversion session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent<'a> {
    /// A table section started
    TableOpened { source_table: &'a str, target_table: &'a str },
    /// A line was skipped because it could not be parsed
    LineSkipped { line: usize, reason: &'a str },
    /// Periodic report every `PROGRESS_INTERVAL_LINES` lines
    Lines { lines_read: usize, rows_converted: usize },
}

/// Progress callback trait for reporting progress
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, event: ProgressEvent<'_>);
}

/// Simple progress callback that logs progress
pub struct LoggingProgressCallback;

impl ProgressCallback for LoggingProgressCallback {
    fn on_progress(&self, event: ProgressEvent<'_>) {
        match event {
            ProgressEvent::TableOpened {
                source_table,
                target_table,
            } => {
                if source_table == target_table {
                    info!("Reading table: {}", source_table);
                } else {
                    info!("Reading table: {} (as {})", source_table, target_table);
                }
            }
            ProgressEvent::LineSkipped { line, reason } => {
                warn!("Skipped line {}: {}", line, reason);
            }
            ProgressEvent::Lines {
                lines_read,
                rows_converted,
            } => {
                info!(
                    "Progress: {} lines read, {} rows converted",
                    lines_read, rows_converted
                );
            }
        }
    }
}
