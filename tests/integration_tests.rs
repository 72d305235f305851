use dumpshift::data_converter::USERS_EXTENSION_COLUMNS;
use dumpshift::monitoring::{ProgressCallback, ProgressEvent};
use dumpshift::types::ProjectionRule;
use dumpshift::{convert_file, convert_str, ConversionConfig, ConversionSession, ConvertError};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const MIXED_DUMP: &str = "\
--
-- PostgreSQL database dump
--

SET statement_timeout = 0;
SET client_encoding = 'UTF8';

COPY public.users (id, username, email, is_admin, created_at, avatar) FROM stdin;
1\talice\talice@example.com\tt\t2023-05-01 09:00:00.5+00\t\\N
2\tbob\tbob@example.com\tf\t2023-06-02 10:30:00+02\tpic.png
\\.

COPY public.matches (id, \"order\", status, notes) FROM stdin;
10\t1\tfinished\tIt's a draw\\\\tie
\\.

INSERT INTO public.teams (id, name, created_at) VALUES (1, 'Red, ''A''', '2024-01-01T12:00:00'), (2, NULL, NULL);
INSERT INTO public.teams (id, name) VALUES (3, E'Blue\\nTeam');

SELECT pg_catalog.setval('public.teams_id_seq', 3, true);
";

#[tokio::test]
async fn test_end_to_end_file_conversion() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("backup.sql");
    let output = temp_dir.path().join("mariadb_import.sql");
    tokio::fs::write(&input, MIXED_DUMP).await.unwrap();

    let report = convert_file(&input, &output, ConversionConfig::default())
        .await
        .unwrap();

    let script = tokio::fs::read_to_string(&output).await.unwrap();
    let expected = "\
-- MariaDB data import (converted from PostgreSQL dump)
-- Generated by dumpshift

-- matches: 1 rows
INSERT INTO matches (id, `order`, `status`, notes) VALUES
  ('10', '1', 'finished', 'It\\'s a draw\\\\\\\\tie');

-- teams: 3 rows
INSERT INTO teams (id, name, created_at) VALUES
  (1, 'Red, \\'A\\'', '2024-01-01 12:00:00'),
  (2, NULL, NULL),
  (3, 'Blue\nTeam', NULL);

-- users_extension: 2 rows
INSERT INTO users_extension (id, email, is_admin, created_at, avatar) VALUES
  ('1', 'alice@example.com', 1, '2023-05-01 09:00:00.5', NULL),
  ('2', 'bob@example.com', 0, '2023-06-02 10:30:00', 'pic.png');

";
    assert_eq!(script, expected);

    assert_eq!(
        report.tables,
        vec![
            ("matches".to_string(), 1),
            ("teams".to_string(), 3),
            ("users_extension".to_string(), 2),
        ]
    );
    assert_eq!(report.stats.rows_converted, 6);
    assert_eq!(report.stats.blocks_opened, 2);
    assert_eq!(report.stats.blocks_closed, 2);
    assert_eq!(report.stats.statements_parsed, 2);
    assert_eq!(report.stats.passthrough_lines, 3);
    assert_eq!(report.stats.malformed_lines, 0);
    assert_eq!(report.stats.tables_emitted, 3);
    assert!(report.duration_ms() >= 0);
}

#[tokio::test]
async fn test_unwritable_output_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("backup.sql");
    tokio::fs::write(&input, MIXED_DUMP).await.unwrap();
    let output = temp_dir.path().join("no_such_dir").join("out.sql");

    let err = convert_file(&input, &output, ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::Io(_)));
    assert!(err.to_string().contains("no_such_dir"));
}

#[test]
fn test_custom_projection_rules() {
    let mut config = ConversionConfig {
        header_lines: vec!["custom header".to_string()],
        ..Default::default()
    };
    config.projection_rules = BTreeMap::from([(
        "accounts".to_string(),
        ProjectionRule::allow_list("members", ["id", "email"]),
    )]);

    let dump = "COPY accounts (id, password, email) FROM stdin;\n5\tsecret\te@x.io\n\\.\n\
                COPY users (id, username) FROM stdin;\n1\talice\n\\.\n";
    let script = convert_str(dump, config).unwrap();

    assert!(script.starts_with("-- custom header\n\n"));
    assert!(script.contains("INSERT INTO members (id, email) VALUES\n  ('5', 'e@x.io');\n"));
    assert!(!script.contains("secret"));
    // without the default rule users keeps every column
    assert!(script.contains("INSERT INTO users (id, username) VALUES\n  ('1', 'alice');\n"));
}

#[test]
fn test_users_allow_list_is_complete() {
    let header = format!("COPY users ({}, legacy_field) FROM stdin;", USERS_EXTENSION_COLUMNS.join(", "));
    let row = vec!["x"; USERS_EXTENSION_COLUMNS.len() + 1].join("\t");
    let dump = format!("{}\n{}\n\\.\n", header, row);

    let script = convert_str(&dump, ConversionConfig::default()).unwrap();
    assert!(script.contains("-- users_extension: 1 rows"));
    assert!(!script.contains("legacy_field"));
    assert!(script.contains("`level`"));
}

#[derive(Default)]
struct CountingCallback {
    tables: Arc<Mutex<Vec<String>>>,
    skipped: Arc<Mutex<usize>>,
}

impl ProgressCallback for CountingCallback {
    fn on_progress(&self, event: ProgressEvent<'_>) {
        match event {
            ProgressEvent::TableOpened { target_table, .. } => {
                self.tables.lock().unwrap().push(target_table.to_string());
            }
            ProgressEvent::LineSkipped { .. } => *self.skipped.lock().unwrap() += 1,
            ProgressEvent::Lines { .. } => {}
        }
    }
}

#[test]
fn test_progress_callback_sees_tables_and_skips() {
    let callback = CountingCallback::default();
    let tables = callback.tables.clone();
    let skipped = callback.skipped.clone();

    let mut session = ConversionSession::new(ConversionConfig::default())
        .unwrap()
        .with_progress_callback(Box::new(callback));
    for line in MIXED_DUMP.lines() {
        session.feed_line(line);
    }
    session.feed_line("INSERT INTO teams (id) VALUES (4, 5);");
    let outcome = session.finish();

    assert_eq!(*tables.lock().unwrap(), vec!["users_extension", "matches", "teams", "teams"]);
    assert_eq!(*skipped.lock().unwrap(), 1);
    assert_eq!(outcome.stats.malformed_lines, 1);
    assert_eq!(outcome.batches.total_rows(), 6);
}
