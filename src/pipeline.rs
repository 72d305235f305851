// Conversion session: drives one dump through tokenizer, projector, converter and emitter
use crate::data_converter::{
    default_rules, validate_identifier, BatchAccumulator, ColumnProjector, SqlEmitter,
    TargetDialect, ValueConverter, DEFAULT_HEADER_LINES,
};
use crate::dump_parser::{DumpTokenizer, LineEvent};
use crate::error::{ConvertError, Result};
use crate::monitoring::{
    ConversionReport, ConversionStats, LoggingProgressCallback, ProgressCallback, ProgressEvent,
    PROGRESS_INTERVAL_LINES,
};
use crate::types::{Projection, ProjectionRule, RecordEncoding, TableBlock};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Configuration for a conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Destination dialect conventions
    pub dialect: TargetDialect,
    /// Projection rules keyed by source table name
    pub projection_rules: BTreeMap<String, ProjectionRule>,
    /// Comment lines written at the top of the script
    pub header_lines: Vec<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dialect: TargetDialect::mariadb(),
            projection_rules: default_rules(),
            header_lines: DEFAULT_HEADER_LINES.iter().map(|line| line.to_string()).collect(),
        }
    }
}

impl ConversionConfig {
    /// Check that every configured identifier can be written to the script
    pub fn validate(&self) -> Result<()> {
        for (source_table, rule) in &self.projection_rules {
            validate_identifier(source_table)?;
            if let ProjectionRule::AllowList {
                target_table,
                allowed_columns,
            } = rule
            {
                validate_identifier(target_table)?;
                if allowed_columns.is_empty() {
                    return Err(ConvertError::config(format!(
                        "Allow-list for table {} is empty",
                        source_table
                    )));
                }
                for column in allowed_columns {
                    validate_identifier(column)?;
                }
            }
        }
        Ok(())
    }
}

/// Accumulated result of a finished session
pub struct ConversionOutcome {
    pub batches: BatchAccumulator,
    pub stats: ConversionStats,
    emitter: SqlEmitter,
}

impl ConversionOutcome {
    pub fn render(&self) -> String {
        self.emitter.render(&self.batches)
    }
}

/// One conversion run. Owns its accumulator, so separate sessions never
/// share rows.
pub struct ConversionSession {
    tokenizer: DumpTokenizer,
    projector: ColumnProjector,
    converter: ValueConverter,
    emitter: SqlEmitter,
    batches: BatchAccumulator,
    stats: ConversionStats,
    /// Projection of the open COPY block
    active: Option<Projection>,
    /// Projection of the most recent INSERT table
    statement_cache: Option<(TableBlock, Projection)>,
    progress: Box<dyn ProgressCallback>,
}

impl ConversionSession {
    pub fn new(config: ConversionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tokenizer: DumpTokenizer::new(),
            projector: ColumnProjector::new(config.dialect.clone(), config.projection_rules),
            batches: BatchAccumulator::new(config.dialect.null_keyword.clone()),
            converter: ValueConverter::new(config.dialect.clone()),
            emitter: SqlEmitter::new(config.dialect, config.header_lines),
            stats: ConversionStats::default(),
            active: None,
            statement_cache: None,
            progress: Box::new(LoggingProgressCallback),
        })
    }

    /// Set a progress callback for long-running conversions
    pub fn with_progress_callback(mut self, callback: Box<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Consume one input line. Parse failures skip the line and never stop
    /// the run.
    pub fn feed_line(&mut self, line: &str) {
        self.stats.lines_read += 1;

        match self.tokenizer.feed_line(line) {
            Ok(event) => self.handle_event(event),
            Err(err) => {
                self.stats.malformed_lines += 1;
                let reason = err.to_string();
                self.progress.on_progress(ProgressEvent::LineSkipped {
                    line: self.tokenizer.line_number(),
                    reason: &reason,
                });
            }
        }

        if self.stats.lines_read % PROGRESS_INTERVAL_LINES == 0 {
            self.progress.on_progress(ProgressEvent::Lines {
                lines_read: self.stats.lines_read,
                rows_converted: self.stats.rows_converted,
            });
        }
    }

    fn handle_event(&mut self, event: LineEvent) {
        match event {
            LineEvent::Skipped => {}
            LineEvent::Passthrough => self.stats.passthrough_lines += 1,
            LineEvent::BlockOpened(block) => {
                self.stats.blocks_opened += 1;
                self.active = Some(self.open_table(&block));
            }
            LineEvent::BlockRow(fields) => {
                if let Some(projection) = self.active.take() {
                    self.accumulate_row(&projection, &fields, RecordEncoding::Block);
                    self.active = Some(projection);
                }
            }
            LineEvent::BlockClosed(_) => {
                self.stats.blocks_closed += 1;
                self.active = None;
            }
            LineEvent::Statement { block, rows } => {
                self.stats.statements_parsed += 1;
                let projection = match self.statement_cache.take() {
                    Some((cached, projection)) if cached == block => projection,
                    _ => self.open_table(&block),
                };
                for fields in &rows {
                    self.accumulate_row(&projection, fields, RecordEncoding::Statement);
                }
                self.statement_cache = Some((block, projection));
            }
        }
    }

    fn open_table(&mut self, block: &TableBlock) -> Projection {
        let projection = self.projector.project(block);
        self.batches
            .register(&projection.target_table, &projection.target_columns);
        self.progress.on_progress(ProgressEvent::TableOpened {
            source_table: &block.table_name,
            target_table: &projection.target_table,
        });
        projection
    }

    fn accumulate_row(&mut self, projection: &Projection, fields: &[String], encoding: RecordEncoding) {
        let picked = self.projector.apply(projection, fields, encoding);
        let row = self
            .converter
            .convert_row(&picked, &projection.hints, encoding);
        self.batches
            .push_row(&projection.target_table, &projection.target_columns, row);
        self.stats.rows_converted += 1;
    }

    /// End the input and hand over everything accumulated
    pub fn finish(self) -> ConversionOutcome {
        let Self {
            tokenizer,
            emitter,
            batches,
            mut stats,
            ..
        } = self;

        if let Some(block) = tokenizer.finish() {
            warn!(
                "Input ended inside the COPY block of {}; keeping the rows read so far",
                block.table_name
            );
        }
        stats.tables_emitted = batches.non_empty_tables().count();

        ConversionOutcome {
            batches,
            stats,
            emitter,
        }
    }
}

/// Run a whole dump held in memory through one session
pub fn convert_lines(input: &str, config: ConversionConfig) -> Result<ConversionOutcome> {
    let mut session = ConversionSession::new(config)?;
    for line in input.lines() {
        session.feed_line(line);
    }
    Ok(session.finish())
}

/// Convert a whole dump held in memory into the target script
pub fn convert_str(input: &str, config: ConversionConfig) -> Result<String> {
    Ok(convert_lines(input, config)?.render())
}

fn io_error_for(path: &Path, err: io::Error) -> ConvertError {
    ConvertError::Io(io::Error::new(
        err.kind(),
        format!("{}: {}", path.display(), err),
    ))
}

/// Convert the dump at `input_path` and write the script to `output_path`.
///
/// I/O failures are fatal; malformed lines are skipped and counted.
pub async fn convert_file(
    input_path: &Path,
    output_path: &Path,
    config: ConversionConfig,
) -> Result<ConversionReport> {
    let started_at = Utc::now();
    info!(
        "Converting {} (PostgreSQL dump) to MariaDB format",
        input_path.display()
    );

    let mut session = ConversionSession::new(config)?;

    // Step 1: stream the dump through the session
    let file = File::open(input_path)
        .await
        .map_err(|e| io_error_for(input_path, e))?;
    let mut lines = BufReader::new(file).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_error_for(input_path, e))?
    {
        session.feed_line(&line);
    }
    let outcome = session.finish();

    // Step 2: flush every table in one pass
    tokio::fs::write(output_path, outcome.render())
        .await
        .map_err(|e| io_error_for(output_path, e))?;

    let tables = outcome
        .batches
        .non_empty_tables()
        .map(|table| (table.target_table.clone(), table.row_count()))
        .collect();

    Ok(ConversionReport {
        input_path: input_path.display().to_string(),
        output_path: output_path.display().to_string(),
        started_at,
        finished_at: Utc::now(),
        stats: outcome.stats,
        tables,
    })
}
