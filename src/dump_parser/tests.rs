// Unit tests for the dump tokenizer and scanner
use super::*;
use crate::error::ConvertError;
use crate::types::TableBlock;

fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod scanner_tests {
    use super::*;

    #[test]
    fn test_copy_header_with_schema_prefix() {
        let (table, columns) =
            parse_copy_header("COPY public.users (id, email, \"order\") FROM stdin;").unwrap();
        assert_eq!(table, "users");
        assert_eq!(columns, cols(&["id", "email", "order"]));
    }

    #[test]
    fn test_copy_header_keywords_are_case_insensitive() {
        let (table, columns) = parse_copy_header("copy games (id) from STDIN;").unwrap();
        assert_eq!(table, "games");
        assert_eq!(columns, cols(&["id"]));
    }

    #[test]
    fn test_copy_header_rejects_missing_stdin() {
        assert!(parse_copy_header("COPY users (id, email) TO stdout;").is_err());
        assert!(parse_copy_header("COPY users (id, email FROM stdin;").is_err());
        assert!(parse_copy_header("COPY users (id) FROM stdin").is_err());
        assert!(parse_copy_header("COPY users () FROM stdin;").is_err());
    }

    #[test]
    fn test_split_respects_nested_parentheses() {
        let fields = split_top_level("1, coalesce(a, b), point(1, (2, 3)), 'x'").unwrap();
        assert_eq!(fields, cols(&["1", "coalesce(a, b)", "point(1, (2, 3))", "'x'"]));
    }

    #[test]
    fn test_split_respects_quoted_commas_and_parens() {
        let fields = split_top_level("'a, b', 'it''s (odd', E'back\\'slash, here'").unwrap();
        assert_eq!(fields, cols(&["'a, b'", "'it''s (odd'", "E'back\\'slash, here'"]));
    }

    #[test]
    fn test_split_standard_string_keeps_trailing_backslash() {
        let fields = split_top_level("'C:\\', 2").unwrap();
        assert_eq!(fields, cols(&["'C:\\'", "2"]));
    }

    #[test]
    fn test_split_reports_broken_nesting() {
        assert!(split_top_level("1, foo(2").is_err());
        assert!(split_top_level("1, 2)").is_err());
        assert!(split_top_level("'open, 2").is_err());
    }

    #[test]
    fn test_parse_insert_multiple_tuples() {
        let statement = parse_insert(
            "INSERT INTO public.games (id, name, meta) VALUES (1, 'Chess, classic', NULL), (2, 'Go', ROW(1, 2));",
        )
        .unwrap();
        assert_eq!(statement.table, "games");
        assert_eq!(statement.columns, cols(&["id", "name", "meta"]));
        assert_eq!(
            statement.tuples,
            vec![
                cols(&["1", "'Chess, classic'", "NULL"]),
                cols(&["2", "'Go'", "ROW(1, 2)"]),
            ]
        );
    }

    #[test]
    fn test_parse_insert_rejects_bad_shapes() {
        assert!(parse_insert("INSERT INTO games VALUES (1, 2);").is_err());
        assert!(parse_insert("INSERT INTO games (id) VALUES (1)").is_err());
        assert!(parse_insert("INSERT INTO games (id) VALUES (1;").is_err());
        assert!(parse_insert("INSERT INTO games (id) VALUES (1) (2);").is_err());
        assert!(parse_insert("INSERT INTO games (id) VALUES (1); DROP TABLE x;").is_err());
    }

    #[test]
    fn test_insert_column_list_detection() {
        assert!(insert_has_column_list("INSERT INTO public.games (id) VALUES (1);"));
        assert!(insert_has_column_list("insert into \"Games\"(id) values (1);"));
        assert!(!insert_has_column_list("INSERT INTO games VALUES (1, 2);"));
        assert!(!insert_has_column_list("INSERT INTO games SELECT * FROM old_games;"));
    }
}

#[cfg(test)]
mod tokenizer_tests {
    use super::*;

    #[test]
    fn test_block_lifecycle() {
        let mut tokenizer = DumpTokenizer::new();

        let opened = tokenizer
            .feed_line("COPY public.users (id, email, extra) FROM stdin;")
            .unwrap();
        let block = TableBlock::new("users", cols(&["id", "email", "extra"]));
        assert_eq!(opened, LineEvent::BlockOpened(block.clone()));
        assert_eq!(tokenizer.open_block(), Some(&block));

        let row = tokenizer.feed_line("1\tx@example.com\t\\N").unwrap();
        assert_eq!(row, LineEvent::BlockRow(cols(&["1", "x@example.com", "\\N"])));

        let closed = tokenizer.feed_line("\\.").unwrap();
        assert_eq!(closed, LineEvent::BlockClosed(block));
        assert!(tokenizer.open_block().is_none());
        assert_eq!(tokenizer.line_number(), 3);
    }

    #[test]
    fn test_block_fields_are_verbatim() {
        let mut tokenizer = DumpTokenizer::new();
        tokenizer.feed_line("COPY notes (id, body) FROM stdin;").unwrap();

        let row = tokenizer.feed_line("7\thello, world 'quoted' \\n").unwrap();
        assert_eq!(row, LineEvent::BlockRow(cols(&["7", "hello, world 'quoted' \\n"])));
    }

    #[test]
    fn test_short_row_is_padded_with_sentinel() {
        let mut tokenizer = DumpTokenizer::new();
        tokenizer.feed_line("COPY users (id, email, extra) FROM stdin;").unwrap();

        let row = tokenizer.feed_line("1").unwrap();
        assert_eq!(row, LineEvent::BlockRow(cols(&["1", "\\N", "\\N"])));
    }

    #[test]
    fn test_blank_line_inside_block_is_a_row() {
        let mut tokenizer = DumpTokenizer::new();
        tokenizer.feed_line("COPY tags (label) FROM stdin;").unwrap();

        let row = tokenizer.feed_line("").unwrap();
        assert_eq!(row, LineEvent::BlockRow(cols(&[""])));
    }

    #[test]
    fn test_overlong_row_is_recoverable() {
        let mut tokenizer = DumpTokenizer::new();
        tokenizer.feed_line("COPY users (id) FROM stdin;").unwrap();

        let err = tokenizer.feed_line("1\t2").unwrap_err();
        assert!(matches!(err, ConvertError::Parse { line: 2, .. }));
        assert!(err.is_recoverable());

        // The block stays open for the following rows
        assert_eq!(tokenizer.feed_line("3").unwrap(), LineEvent::BlockRow(cols(&["3"])));
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut tokenizer = DumpTokenizer::new();
        tokenizer.feed_line("COPY users (id) FROM stdin;\r").unwrap();
        assert_eq!(tokenizer.feed_line("5\r").unwrap(), LineEvent::BlockRow(cols(&["5"])));
        assert!(matches!(tokenizer.feed_line("\\.\r").unwrap(), LineEvent::BlockClosed(_)));
    }

    #[test]
    fn test_top_level_noise() {
        let mut tokenizer = DumpTokenizer::new();
        assert_eq!(tokenizer.feed_line("").unwrap(), LineEvent::Skipped);
        assert_eq!(tokenizer.feed_line("   ").unwrap(), LineEvent::Skipped);
        assert_eq!(tokenizer.feed_line("-- PostgreSQL database dump").unwrap(), LineEvent::Skipped);
        assert_eq!(
            tokenizer.feed_line("SET statement_timeout = 0;").unwrap(),
            LineEvent::Passthrough
        );
        assert_eq!(
            tokenizer.feed_line("SELECT pg_catalog.setval('users_id_seq', 42, true);").unwrap(),
            LineEvent::Passthrough
        );
        assert_eq!(tokenizer.feed_line("COPYRIGHT 2024").unwrap(), LineEvent::Passthrough);
    }

    #[test]
    fn test_insert_without_column_list_passes_through() {
        let mut tokenizer = DumpTokenizer::new();
        assert_eq!(
            tokenizer.feed_line("INSERT INTO games VALUES (1, 'chess');").unwrap(),
            LineEvent::Passthrough
        );
        assert_eq!(
            tokenizer.feed_line("INSERT INTO archive SELECT * FROM games;").unwrap(),
            LineEvent::Passthrough
        );
        // A column list makes it a statement again, even when broken later on
        assert!(tokenizer.feed_line("INSERT INTO games (id) VALUES (1;").is_err());
    }

    #[test]
    fn test_malformed_header_opens_no_block() {
        let mut tokenizer = DumpTokenizer::new();
        let err = tokenizer.feed_line("COPY users (id, email FROM stdin;").unwrap_err();
        assert!(matches!(err, ConvertError::Parse { line: 1, .. }));
        assert!(tokenizer.open_block().is_none());

        // Orphaned data lines are not table data
        assert_eq!(tokenizer.feed_line("1\tx@example.com").unwrap(), LineEvent::Passthrough);
    }

    #[test]
    fn test_insert_statement_rows() {
        let mut tokenizer = DumpTokenizer::new();
        let event = tokenizer
            .feed_line("INSERT INTO public.users (id, email, nickname) VALUES (1, 'a@b.c', 'x'), (2, NULL);")
            .unwrap();

        assert_eq!(
            event,
            LineEvent::Statement {
                block: TableBlock::new("users", cols(&["id", "email", "nickname"])),
                rows: vec![
                    cols(&["1", "'a@b.c'", "'x'"]),
                    cols(&["2", "NULL", "NULL"]),
                ],
            }
        );
    }

    #[test]
    fn test_insert_with_too_many_values_is_skipped() {
        let mut tokenizer = DumpTokenizer::new();
        let err = tokenizer
            .feed_line("INSERT INTO users (id) VALUES (1, 2);")
            .unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_unterminated_block_is_reported_on_finish() {
        let mut tokenizer = DumpTokenizer::new();
        tokenizer.feed_line("COPY users (id) FROM stdin;").unwrap();
        tokenizer.feed_line("1").unwrap();

        let pending = tokenizer.finish();
        assert_eq!(pending, Some(TableBlock::new("users", cols(&["id"]))));
    }
}
