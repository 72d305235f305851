// Target dialect description: literals, identifier quoting and reserved words
use crate::error::{ConvertError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maximum identifier length accepted by MariaDB
const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Identifiers that must be quoted in MariaDB/MySQL column lists
static MARIADB_RESERVED_WORDS: Lazy<BTreeSet<String>> = Lazy::new(|| {
    [
        "order", "group", "select", "from", "where", "table", "key", "value", "status",
        "level", "range", "check", "create", "alter", "drop", "delete", "insert", "update",
        "union", "join", "left", "right", "inner", "outer", "on", "using", "having",
        "limit", "offset", "distinct", "all", "any", "some", "exists", "in", "between",
        "like", "is", "null", "and", "or", "not", "as", "by", "with", "case", "when",
        "then", "else", "end", "type", "user", "role", "permission", "column", "index",
        "constraint", "foreign", "primary", "unique", "default", "cascade", "restrict",
        "action", "match", "partition", "interval", "precision", "set", "change", "modify",
        "rename", "add", "call", "procedure", "function", "trigger", "view", "database",
        "schema",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
});

/// Literal and identifier conventions of the destination database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDialect {
    /// Character wrapping quoted identifiers
    pub identifier_quote: char,
    /// Case-folded identifiers that always need quoting
    pub reserved_words: BTreeSet<String>,
    pub null_keyword: String,
    pub true_literal: String,
    pub false_literal: String,
}

impl TargetDialect {
    pub fn mariadb() -> Self {
        Self {
            identifier_quote: '`',
            reserved_words: MARIADB_RESERVED_WORDS.clone(),
            null_keyword: "NULL".to_string(),
            true_literal: "1".to_string(),
            false_literal: "0".to_string(),
        }
    }

    pub fn is_reserved(&self, identifier: &str) -> bool {
        self.reserved_words.contains(identifier)
    }

    /// Case-fold an identifier and quote it if it is a reserved word
    pub fn column_identifier(&self, name: &str) -> String {
        let folded = name.to_lowercase();
        if self.is_reserved(&folded) {
            self.quote_identifier(&folded)
        } else {
            folded
        }
    }

    /// Quote a table name only when it collides with a reserved word
    pub fn table_identifier(&self, name: &str) -> String {
        if self.is_reserved(&name.to_lowercase()) {
            self.quote_identifier(name)
        } else {
            name.to_string()
        }
    }

    /// Wrap in the identifier quote, doubling embedded quote characters
    pub fn quote_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote;
        let doubled: String = [quote, quote].iter().collect();
        format!("{quote}{}{quote}", name.replace(quote, &doubled))
    }

    /// Escape a string literal: backslashes doubled, quotes backslash-escaped
    pub fn quote_literal(&self, value: &str) -> String {
        let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
        format!("'{}'", escaped)
    }

    pub fn boolean_literal(&self, value: bool) -> &str {
        if value {
            &self.true_literal
        } else {
            &self.false_literal
        }
    }
}

impl Default for TargetDialect {
    fn default() -> Self {
        Self::mariadb()
    }
}

/// Validate a configured identifier before it is written into the script
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ConvertError::config("Identifier cannot be empty"));
    }
    if name.contains('\0') {
        return Err(ConvertError::config(format!(
            "Identifier contains a null byte: {:?}",
            name
        )));
    }
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ConvertError::config(format!(
            "Identifier exceeds maximum length of {} bytes: {:?}",
            MAX_IDENTIFIER_LENGTH, name
        )));
    }
    Ok(())
}
