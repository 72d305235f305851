// Dump parser module for PostgreSQL data exports
pub mod scanner;
pub mod tokenizer;

#[cfg(test)]
mod tests;

pub use scanner::{
    insert_has_column_list, parse_copy_header, parse_insert, split_top_level, InsertStatement,
};
pub use tokenizer::{DumpTokenizer, LineEvent};
