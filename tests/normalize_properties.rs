use proptest::prelude::*;

use strict_csv_transcode::normalize::normalize;
use strict_csv_transcode::TranscodeError;

fn field() -> impl Strategy<Value = String> {
    "[A-Za-z0-9.:-]{0,8}"
}

fn header() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Za-z_][A-Za-z0-9_]{0,6}", 1..6)
}

proptest! {
    #[test]
    fn output_keeps_exactly_the_leading_fields(
        header in header(),
        rows in prop::collection::vec((prop::collection::vec(field(), 6), 0usize..4), 0..20),
        blank_lines in 0usize..3,
        crlf in any::<bool>(),
    ) {
        let width = header.len();
        let eol = if crlf { "\r\n" } else { "\n" };

        let mut input = header.join(",");
        input.push_str(eol);
        for _ in 0..blank_lines {
            input.push_str(eol);
        }

        let mut expected = String::new();
        let mut truncated = 0u64;
        for (fields, extra) in &rows {
            let padded: Vec<&str> = fields
                .iter()
                .map(String::as_str)
                .cycle()
                .take(width + extra)
                .collect();
            input.push_str(&padded.join(","));
            input.push_str(eol);

            expected.push_str(&padded[..width].join(","));
            expected.push('\n');
            if *extra > 0 {
                truncated += 1;
            }
        }

        // A raw line made of one empty field is blank, and blank lines are never records.
        prop_assume!(!rows
            .iter()
            .any(|(fields, extra)| width + extra == 1 && fields[0].is_empty()));

        let mut out = Vec::<u8>::new();
        let stats = normalize(input.as_bytes(), &header, &mut out).unwrap();
        prop_assert_eq!(String::from_utf8(out).unwrap(), expected.clone());
        prop_assert_eq!(stats.records, rows.len() as u64);
        prop_assert_eq!(stats.records_truncated, truncated);
        prop_assert_eq!(stats.blank_lines_skipped, blank_lines as u64);

        // Trailing fields dropped from a one-column record can leave an empty cleaned line,
        // which a second pass would read as blank.
        if expected.lines().any(str::is_empty) {
            return Ok(());
        }
        let again_input = format!("{}\n{expected}", header.join(","));
        let mut again = Vec::<u8>::new();
        let again_stats = normalize(again_input.as_bytes(), &header, &mut again).unwrap();
        prop_assert_eq!(String::from_utf8(again).unwrap(), expected);
        prop_assert_eq!(again_stats.records_truncated, 0);
    }

    #[test]
    fn short_line_is_reported_with_its_number(
        width in 2usize..8,
        good_rows in 0usize..10,
        missing in 1usize..8,
    ) {
        let missing = missing.min(width - 1);
        let header: Vec<String> = (0..width).map(|i| format!("c{i}")).collect();
        let full = vec!["1"; width].join(",");
        let short = vec!["1"; width - missing].join(",");

        let mut input = header.join(",");
        input.push('\n');
        for _ in 0..good_rows {
            input.push_str(&full);
            input.push('\n');
        }
        input.push_str(&short);
        input.push('\n');
        input.push_str(&full);
        input.push('\n');

        let mut out = Vec::<u8>::new();
        let err = normalize(input.as_bytes(), &header, &mut out).unwrap_err();
        match err {
            TranscodeError::InvalidData { line, line_number } => {
                prop_assert_eq!(line, short);
                prop_assert_eq!(line_number, good_rows as u64 + 2);
            }
            other => prop_assert!(false, "unexpected error {:?}", other),
        }
    }
}
