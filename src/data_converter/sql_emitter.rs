use crate::data_converter::dialect::TargetDialect;
use crate::types::ConvertedRow;
use std::collections::BTreeMap;
use tracing::debug;

/// Converted rows collected for one target table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAccumulator {
    pub target_table: String,
    pub target_columns: Vec<String>,
    pub rows: Vec<ConvertedRow>,
}

impl TableAccumulator {
    pub fn new(target_table: impl Into<String>, target_columns: Vec<String>) -> Self {
        Self {
            target_table: target_table.into(),
            target_columns,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Add columns this table has not seen yet, padding existing rows
    pub fn merge_columns(&mut self, columns: &[String], null_keyword: &str) {
        for column in columns {
            if self.target_columns.contains(column) {
                continue;
            }
            debug!("Table {} gains column {}", self.target_table, column);
            self.target_columns.push(column.clone());
            for row in &mut self.rows {
                row.push(null_keyword.to_string());
            }
        }
    }

    /// Append a row whose values line up with `columns`.
    ///
    /// When `columns` differs from the accumulated column list the row is
    /// re-aligned by column name and gaps are filled with `null_keyword`.
    pub fn append(&mut self, columns: &[String], row: ConvertedRow, null_keyword: &str) {
        if columns == self.target_columns.as_slice() {
            self.rows.push(row);
            return;
        }

        self.merge_columns(columns, null_keyword);
        let aligned = self
            .target_columns
            .iter()
            .map(|target| {
                columns
                    .iter()
                    .position(|column| column == target)
                    .and_then(|index| row.get(index).cloned())
                    .unwrap_or_else(|| null_keyword.to_string())
            })
            .collect();
        self.rows.push(aligned);
    }
}

/// All table accumulators of one conversion run, keyed and ordered by the
/// unquoted target table name
#[derive(Debug, Clone)]
pub struct BatchAccumulator {
    tables: BTreeMap<String, TableAccumulator>,
    null_keyword: String,
}

impl BatchAccumulator {
    pub fn new(null_keyword: impl Into<String>) -> Self {
        Self {
            tables: BTreeMap::new(),
            null_keyword: null_keyword.into(),
        }
    }

    /// Make sure a table exists, merging its columns into any earlier ones
    pub fn register(&mut self, target_table: &str, columns: &[String]) -> &mut TableAccumulator {
        let null_keyword = &self.null_keyword;
        let table = self
            .tables
            .entry(target_table.to_string())
            .or_insert_with(|| TableAccumulator::new(target_table, columns.to_vec()));
        table.merge_columns(columns, null_keyword);
        table
    }

    pub fn push_row(&mut self, target_table: &str, columns: &[String], row: ConvertedRow) {
        debug_assert_eq!(columns.len(), row.len());
        let null_keyword = self.null_keyword.clone();
        self.register(target_table, columns)
            .append(columns, row, &null_keyword);
    }

    pub fn get(&self, target_table: &str) -> Option<&TableAccumulator> {
        self.tables.get(target_table)
    }

    /// Tables in ascending byte order of their target name
    pub fn tables(&self) -> impl Iterator<Item = &TableAccumulator> {
        self.tables.values()
    }

    /// Tables that will produce an INSERT statement
    pub fn non_empty_tables(&self) -> impl Iterator<Item = &TableAccumulator> {
        self.tables().filter(|table| !table.rows.is_empty())
    }

    pub fn total_rows(&self) -> usize {
        self.tables.values().map(TableAccumulator::row_count).sum()
    }
}

/// Comment lines written at the top of every script unless configured otherwise
pub const DEFAULT_HEADER_LINES: [&str; 2] = [
    "MariaDB data import (converted from PostgreSQL dump)",
    "Generated by dumpshift",
];

/// Serializes accumulated tables into one batch INSERT per table
#[derive(Debug, Clone)]
pub struct SqlEmitter {
    dialect: TargetDialect,
    header_lines: Vec<String>,
}

impl SqlEmitter {
    pub fn new(dialect: TargetDialect, header_lines: Vec<String>) -> Self {
        Self {
            dialect,
            header_lines,
        }
    }

    /// Render the whole script: header comment, then one section per table
    /// that has at least one row
    pub fn render(&self, batches: &BatchAccumulator) -> String {
        let mut script = String::new();
        for line in &self.header_lines {
            script.push_str(&format!("-- {}\n", line));
        }
        script.push('\n');

        for table in batches.non_empty_tables() {
            self.render_table(table, &mut script);
        }
        script
    }

    fn render_table(&self, table: &TableAccumulator, script: &mut String) {
        // Tables are ordered by their bare name; quoting only happens here
        let table_name = self.dialect.table_identifier(&table.target_table);
        script.push_str(&format!("-- {}: {} rows\n", table_name, table.row_count()));
        script.push_str(&format!(
            "INSERT INTO {} ({}) VALUES\n",
            table_name,
            table.target_columns.join(", ")
        ));

        let last = table.rows.len().saturating_sub(1);
        for (index, row) in table.rows.iter().enumerate() {
            let terminator = if index == last { ';' } else { ',' };
            script.push_str(&format!("  ({}){}\n", row.join(", "), terminator));
        }
        script.push('\n');
    }
}
