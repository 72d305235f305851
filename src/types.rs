use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Null sentinel used by `COPY ... FROM stdin` data rows
pub const BLOCK_NULL_SENTINEL: &str = "\\N";

/// Line that terminates a `COPY` data block
pub const BLOCK_TERMINATOR: &str = "\\.";

/// The two dump record shapes understood by the tokenizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordEncoding {
    /// Tab-delimited rows between a `COPY` header and `\.`
    Block,
    /// Comma-delimited tuples of an `INSERT INTO ... VALUES` line
    Statement,
}

/// Source tokens with a fixed meaning in one record encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTokens {
    pub null: &'static str,
    pub true_token: &'static str,
    pub false_token: &'static str,
    /// Statement keywords are matched without regard to case
    pub case_insensitive: bool,
}

impl RecordEncoding {
    pub fn tokens(self) -> SourceTokens {
        match self {
            RecordEncoding::Block => SourceTokens {
                null: BLOCK_NULL_SENTINEL,
                true_token: "t",
                false_token: "f",
                case_insensitive: false,
            },
            RecordEncoding::Statement => SourceTokens {
                null: "NULL",
                true_token: "TRUE",
                false_token: "FALSE",
                case_insensitive: true,
            },
        }
    }

    /// Sentinel used to pad rows that are shorter than their column list
    pub fn null_sentinel(self) -> &'static str {
        self.tokens().null
    }
}

impl SourceTokens {
    fn matches(&self, token: &str, raw: &str) -> bool {
        if self.case_insensitive {
            raw.eq_ignore_ascii_case(token)
        } else {
            raw == token
        }
    }

    pub fn is_null(&self, raw: &str) -> bool {
        self.matches(self.null, raw)
    }

    /// Boolean meaning of `raw`, if it is one of the boolean tokens
    pub fn boolean(&self, raw: &str) -> Option<bool> {
        if self.matches(self.true_token, raw) {
            Some(true)
        } else if self.matches(self.false_token, raw) {
            Some(false)
        } else {
            None
        }
    }
}

/// Table name and declared columns of a dump section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBlock {
    /// Unqualified, unquoted source table name
    pub table_name: String,
    /// Source column names in declaration order
    pub source_columns: Vec<String>,
}

impl TableBlock {
    pub fn new(table_name: impl Into<String>, source_columns: Vec<String>) -> Self {
        Self {
            table_name: table_name.into(),
            source_columns,
        }
    }
}

/// Hint passed to the value converter for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueHint {
    Plain,
    /// Column name suggests a date-time value
    Timestamp,
}

impl ValueHint {
    /// Derive the hint from a case-folded column name
    pub fn for_column(column: &str) -> Self {
        if column.contains("timestamp") || column.ends_with("_at") {
            ValueHint::Timestamp
        } else {
            ValueHint::Plain
        }
    }
}

/// How the columns of one source table reach the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionRule {
    /// Keep every column, quoting reserved identifiers
    Identity,
    /// Rename the table and keep only the listed columns
    AllowList {
        target_table: String,
        allowed_columns: BTreeSet<String>,
    },
}

impl ProjectionRule {
    pub fn allow_list<I, S>(target_table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ProjectionRule::AllowList {
            target_table: target_table.into(),
            allowed_columns: columns
                .into_iter()
                .map(|c| c.as_ref().to_lowercase())
                .collect(),
        }
    }
}

/// Result of projecting a table onto the target schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// Unquoted target table name; quoting is applied when the script is written
    pub target_table: String,
    /// Target column names, case-folded and quoted where needed
    pub target_columns: Vec<String>,
    /// Source field positions feeding each target column
    pub keep_positions: Vec<usize>,
    /// Converter hint for each target column
    pub hints: Vec<ValueHint>,
}

/// One row of target-dialect literals
pub type ConvertedRow = Vec<String>;
