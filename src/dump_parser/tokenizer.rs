// Line tokenizer for PostgreSQL data dumps
use crate::dump_parser::scanner::{
    insert_has_column_list, parse_copy_header, parse_insert, starts_with_keyword,
};
use crate::error::{ConvertError, Result};
use crate::types::{RecordEncoding, TableBlock, BLOCK_TERMINATOR};
use tracing::debug;

/// What a single input line turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// Blank line or `--` comment outside a block
    Skipped,
    /// Top-level line that is not part of the table pipeline
    Passthrough,
    /// A `COPY ... FROM stdin;` header
    BlockOpened(TableBlock),
    /// One data row of the open block, one field per declared column
    BlockRow(Vec<String>),
    /// The `\.` terminator of the open block
    BlockClosed(TableBlock),
    /// A complete `INSERT INTO ... VALUES` line
    Statement {
        block: TableBlock,
        rows: Vec<Vec<String>>,
    },
}

/// Streaming tokenizer that recognizes both dump encodings
#[derive(Debug, Default)]
pub struct DumpTokenizer {
    open_block: Option<TableBlock>,
    line_number: usize,
}

impl DumpTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1-based number of the last line fed
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// The block currently being read, if any
    pub fn open_block(&self) -> Option<&TableBlock> {
        self.open_block.as_ref()
    }

    /// Tokenize one line (without its trailing newline).
    ///
    /// A parse error only concerns this line; the tokenizer stays usable and
    /// any open block stays open.
    pub fn feed_line(&mut self, line: &str) -> Result<LineEvent> {
        self.line_number += 1;
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(block) = self.open_block.take() {
            if line == BLOCK_TERMINATOR {
                return Ok(LineEvent::BlockClosed(block));
            }
            let split = split_block_row(line, block.source_columns.len());
            self.open_block = Some(block);
            let fields = split.map_err(|message| ConvertError::parse(self.line_number, message))?;
            return Ok(LineEvent::BlockRow(fields));
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            return Ok(LineEvent::Skipped);
        }

        if starts_with_keyword(trimmed, "COPY") {
            let (table_name, columns) = parse_copy_header(trimmed).map_err(|message| {
                ConvertError::parse(self.line_number, format!("malformed COPY header: {}", message))
            })?;
            let block = TableBlock::new(table_name, columns);
            self.open_block = Some(block.clone());
            return Ok(LineEvent::BlockOpened(block));
        }

        if starts_with_keyword(trimmed, "INSERT") && insert_has_column_list(trimmed) {
            let statement = parse_insert(trimmed).map_err(|message| {
                ConvertError::parse(self.line_number, format!("malformed INSERT statement: {}", message))
            })?;
            let width = statement.columns.len();
            let mut rows = Vec::with_capacity(statement.tuples.len());
            for (index, mut tuple) in statement.tuples.into_iter().enumerate() {
                if tuple.len() > width {
                    return Err(ConvertError::parse(
                        self.line_number,
                        format!(
                            "tuple {} has {} values for {} columns",
                            index + 1,
                            tuple.len(),
                            width
                        ),
                    ));
                }
                tuple.resize(width, RecordEncoding::Statement.null_sentinel().to_string());
                rows.push(tuple);
            }
            return Ok(LineEvent::Statement {
                block: TableBlock::new(statement.table, statement.columns),
                rows,
            });
        }

        debug!("Line {} is not table data, passing through", self.line_number);
        Ok(LineEvent::Passthrough)
    }

    /// Finish the input, returning a block that was never terminated
    pub fn finish(self) -> Option<TableBlock> {
        self.open_block
    }
}

/// Split a COPY data row on tabs, padding short rows with the null sentinel
fn split_block_row(line: &str, width: usize) -> std::result::Result<Vec<String>, String> {
    let mut fields: Vec<String> = line.split('\t').map(str::to_string).collect();
    if fields.len() > width {
        return Err(format!(
            "data row has {} fields for {} columns",
            fields.len(),
            width
        ));
    }
    fields.resize(width, RecordEncoding::Block.null_sentinel().to_string());
    Ok(fields)
}
