use crate::data_converter::dialect::TargetDialect;
use crate::types::{Projection, ProjectionRule, RecordEncoding, TableBlock, ValueHint};
use std::collections::BTreeMap;
use tracing::debug;

/// Columns of `users` that exist in the target `users_extension` table
pub const USERS_EXTENSION_COLUMNS: [&str; 30] = [
    "id", "nickname", "email", "password_hash", "language", "discord_id", "elo_rating",
    "level", "is_active", "is_blocked", "is_admin", "created_at", "updated_at", "is_rated",
    "matches_played", "elo_provisional", "total_wins", "total_losses", "trend",
    "failed_login_attempts", "locked_until", "last_login_attempt", "password_must_change",
    "country", "avatar", "email_verified", "password_reset_token", "password_reset_expires",
    "email_verification_token", "email_verification_expires",
];

static IDENTITY: ProjectionRule = ProjectionRule::Identity;

/// Projection rules applied when no custom policy is configured
pub fn default_rules() -> BTreeMap<String, ProjectionRule> {
    BTreeMap::from([(
        "users".to_string(),
        ProjectionRule::allow_list("users_extension", USERS_EXTENSION_COLUMNS),
    )])
}

/// Maps source table columns onto the target column set
#[derive(Debug, Clone)]
pub struct ColumnProjector {
    dialect: TargetDialect,
    /// Rules keyed by case-folded source table name
    rules: BTreeMap<String, ProjectionRule>,
}

impl ColumnProjector {
    pub fn new(dialect: TargetDialect, rules: BTreeMap<String, ProjectionRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|(table, rule)| (table.to_lowercase(), rule))
            .collect();
        Self { dialect, rules }
    }

    /// Rule for a source table; tables without a rule keep every column
    pub fn rule_for(&self, table_name: &str) -> &ProjectionRule {
        self.rules
            .get(&table_name.to_lowercase())
            .unwrap_or(&IDENTITY)
    }

    /// Compute the target table, target columns and kept source positions.
    ///
    /// Kept positions always follow source order, whatever order the
    /// allow-list was declared in.
    pub fn project(&self, block: &TableBlock) -> Projection {
        let (target_table, keep_positions): (&str, Vec<usize>) =
            match self.rule_for(&block.table_name) {
                ProjectionRule::Identity => {
                    (block.table_name.as_str(), (0..block.source_columns.len()).collect())
                }
                ProjectionRule::AllowList {
                    target_table,
                    allowed_columns,
                } => {
                    let kept = block
                        .source_columns
                        .iter()
                        .enumerate()
                        .filter(|(_, column)| allowed_columns.contains(&column.to_lowercase()))
                        .map(|(index, _)| index)
                        .collect::<Vec<_>>();
                    let dropped = block.source_columns.len() - kept.len();
                    if dropped > 0 {
                        debug!(
                            "Dropping {} column(s) of {} not present in {}",
                            dropped, block.table_name, target_table
                        );
                    }
                    (target_table.as_str(), kept)
                }
            };

        let folded: Vec<String> = keep_positions
            .iter()
            .map(|&index| block.source_columns[index].to_lowercase())
            .collect();

        Projection {
            target_table: target_table.to_string(),
            target_columns: folded
                .iter()
                .map(|column| self.dialect.column_identifier(column))
                .collect(),
            hints: folded.iter().map(|column| ValueHint::for_column(column)).collect(),
            keep_positions,
        }
    }

    /// Pick the kept fields of a row; positions past the end of the row read
    /// as the encoding's null sentinel
    pub fn apply<'a>(
        &self,
        projection: &Projection,
        fields: &'a [String],
        encoding: RecordEncoding,
    ) -> Vec<&'a str> {
        projection
            .keep_positions
            .iter()
            .map(|&index| {
                fields
                    .get(index)
                    .map(String::as_str)
                    .unwrap_or_else(|| encoding.null_sentinel())
            })
            .collect()
    }
}

impl Default for ColumnProjector {
    fn default() -> Self {
        Self::new(TargetDialect::mariadb(), default_rules())
    }
}
