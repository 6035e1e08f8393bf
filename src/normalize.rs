//! Record normalization.
//!
//! [`normalize`] streams a raw delimited byte source into a cleaned byte sink:
//!
//! - the first line must equal the expected header exactly (names, order, count, case)
//! - blank lines between the header and the first data line are skipped
//! - each data line is cut down to its first `H` comma-separated fields (`H` = header length);
//!   trailing extra fields are dropped, missing fields are an error
//!
//! Only one line is buffered at a time.

use std::io::{BufRead, Write};

use crate::error::{TranscodeError, TranscodeResult};

/// Counters reported by a successful [`normalize`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Cleaned records written to the sink.
    pub records: u64,
    /// Blank lines skipped between the header and the first data line.
    pub blank_lines_skipped: u64,
    /// Records that carried trailing fields beyond the header width.
    pub records_truncated: u64,
}

/// The leading `H` fields of a data line, as located by [`leading_fields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadingFields<'a> {
    /// The captured fields with their separating commas, without any line terminator.
    pub bytes: &'a [u8],
    /// `true` if the line continued with further fields after the captured ones.
    pub truncated: bool,
}

/// Normalize `input` into `sink`, validating it against `header`.
///
/// Every cleaned record is written as the captured fields followed by a single `\n`.
///
/// Errors:
///
/// - [`TranscodeError::InvalidHeader`] if the first line does not match `header`; nothing after
///   the first line is read
/// - [`TranscodeError::InvalidData`] for the first data line that has fewer than `header.len()`
///   fields, or that is blank once the data section has started
///
/// Reaching end of input right after the header (or after blank lines only) is not an error;
/// the sink then receives nothing.
pub fn normalize<R, W, S>(mut input: R, header: &[S], mut sink: W) -> TranscodeResult<NormalizeStats>
where
    R: BufRead,
    W: Write,
    S: AsRef<str>,
{
    if header.is_empty() {
        return Err(TranscodeError::config("expected header is empty"));
    }

    let width = header.len();
    let mut stats = NormalizeStats::default();
    let mut line = Vec::new();
    let mut line_number: u64 = 1;

    read_line(&mut input, &mut line)?;
    check_header(&line, header)?;

    loop {
        if read_line(&mut input, &mut line)? == 0 {
            return Ok(stats);
        }
        line_number += 1;
        if !is_blank(&line) {
            break;
        }
        stats.blank_lines_skipped += 1;
    }

    loop {
        let fields = if is_blank(&line) {
            None
        } else {
            leading_fields(&line, width)
        };
        let Some(fields) = fields else {
            return Err(TranscodeError::InvalidData {
                line: display_line(&line),
                line_number,
            });
        };

        if fields.truncated {
            stats.records_truncated += 1;
        }
        sink.write_all(fields.bytes)?;
        sink.write_all(b"\n")?;
        stats.records += 1;

        if read_line(&mut input, &mut line)? == 0 {
            break;
        }
        line_number += 1;
    }

    sink.flush()?;
    Ok(stats)
}

/// Locate the first `width` comma-separated fields of `line`.
///
/// Each of the first `width - 1` fields is any run of bytes up to and including the next comma;
/// the last captured field stops at a comma, `\r`, `\n`, or the end of `line`. Returns `None` if
/// the line does not contain `width - 1` commas (or if `width == 0`).
pub fn leading_fields(line: &[u8], width: usize) -> Option<LeadingFields<'_>> {
    if width == 0 {
        return None;
    }

    let mut start = 0;
    for _ in 1..width {
        let comma = line[start..].iter().position(|&b| b == b',')?;
        start += comma + 1;
    }

    let last = &line[start..];
    let len = last
        .iter()
        .position(|&b| matches!(b, b',' | b'\r' | b'\n'))
        .unwrap_or(last.len());
    let end = start + len;

    Some(LeadingFields {
        bytes: &line[..end],
        truncated: line.get(end) == Some(&b','),
    })
}

fn read_line<R: BufRead>(input: &mut R, buf: &mut Vec<u8>) -> TranscodeResult<usize> {
    buf.clear();
    Ok(input.read_until(b'\n', buf)?)
}

fn check_header<S: AsRef<str>>(line: &[u8], header: &[S]) -> TranscodeResult<()> {
    let matches = std::str::from_utf8(trim_end(line))
        .map(|text| text.split(',').eq(header.iter().map(AsRef::as_ref)))
        .unwrap_or(false);

    if matches {
        Ok(())
    } else {
        Err(TranscodeError::InvalidHeader {
            line: display_line(line),
        })
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0b' | b'\x0c')
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|&b| is_space(b))
}

fn trim_end(line: &[u8]) -> &[u8] {
    let end = line.iter().rposition(|&b| !is_space(b)).map_or(0, |i| i + 1);
    &line[..end]
}

/// Raw line for error reports, without its line terminator.
fn display_line(line: &[u8]) -> String {
    let end = line
        .iter()
        .rposition(|&b| b != b'\n' && b != b'\r')
        .map_or(0, |i| i + 1);
    String::from_utf8_lossy(&line[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{leading_fields, normalize, NormalizeStats};
    use crate::error::TranscodeError;

    const HEADER: [&str; 3] = ["a", "b", "c"];

    fn run(input: &str) -> Result<(String, NormalizeStats), TranscodeError> {
        let mut out = Vec::new();
        let stats = normalize(input.as_bytes(), &HEADER, &mut out)?;
        Ok((String::from_utf8(out).unwrap(), stats))
    }

    #[test]
    fn leading_fields_drops_trailing_fields() {
        let f = leading_fields(b"1,2,3,,,\n", 3).unwrap();
        assert_eq!(f.bytes, b"1,2,3");
        assert!(f.truncated);

        let f = leading_fields(b"1,2,3\r\n", 3).unwrap();
        assert_eq!(f.bytes, b"1,2,3");
        assert!(!f.truncated);

        let f = leading_fields(b",,", 3).unwrap();
        assert_eq!(f.bytes, b",,");
    }

    #[test]
    fn leading_fields_requires_enough_separators() {
        assert_eq!(leading_fields(b"1,2\n", 3), None);
        assert_eq!(leading_fields(b"", 2), None);
        assert_eq!(leading_fields(b"x", 0), None);
        assert!(leading_fields(b"", 1).is_some());
    }

    #[test]
    fn header_blank_lines_and_truncation() {
        let (out, stats) = run("a,b,c\n\n  \r\n1,2,3,,\n4,5,6\n").unwrap();
        assert_eq!(out, "1,2,3\n4,5,6\n");
        assert_eq!(
            stats,
            NormalizeStats {
                records: 2,
                blank_lines_skipped: 2,
                records_truncated: 1,
            }
        );
    }

    #[test]
    fn header_trailing_whitespace_is_ignored() {
        let (out, _) = run("a,b,c \r\n1,2,3").unwrap();
        assert_eq!(out, "1,2,3\n");
    }

    #[test]
    fn header_only_or_blank_only_is_empty_success() {
        assert_eq!(run("a,b,c\n").unwrap().0, "");
        assert_eq!(run("a,b,c\n\n\n").unwrap().1.records, 0);
        assert_eq!(run("a,b,c").unwrap().1, NormalizeStats::default());
    }

    #[test]
    fn header_mismatch_variants() {
        for bad in ["A,b,c\n", "b,a,c\n", "a,b\n", "a,b,c,d\n", "a,b,x\n", "", "\n"] {
            match run(bad) {
                Err(TranscodeError::InvalidHeader { line }) => {
                    assert_eq!(line, bad.trim_end_matches('\n'));
                }
                other => panic!("expected InvalidHeader for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn header_failure_reads_nothing_more() {
        let mut input = Cursor::new(b"a,B,c\n1,2,3\n".to_vec());
        let err = normalize(&mut input, &HEADER, Vec::<u8>::new()).unwrap_err();
        assert!(matches!(err, TranscodeError::InvalidHeader { .. }));
        assert_eq!(input.position(), 6);
    }

    #[test]
    fn short_line_is_invalid_data_with_position() {
        let mut out = Vec::new();
        let err = normalize("a,b,c\n\n1,2,3\n4,5\n7,8,9\n".as_bytes(), &HEADER, &mut out).unwrap_err();
        match err {
            TranscodeError::InvalidData { line, line_number } => {
                assert_eq!(line, "4,5");
                assert_eq!(line_number, 4);
            }
            other => panic!("unexpected error {other:?}"),
        }
        // The line after the failure never reaches the sink.
        assert_eq!(out, b"1,2,3\n");
    }

    #[test]
    fn blank_line_inside_data_is_invalid_data() {
        let err = run("a,b,c\n1,2,3\n\n4,5,6\n").unwrap_err();
        assert!(matches!(
            err,
            TranscodeError::InvalidData { line_number: 3, .. }
        ));
    }

    #[test]
    fn single_column_blank_data_line_is_rejected() {
        let mut out = Vec::new();
        let err = normalize("a\nx\n\n".as_bytes(), &["a"], &mut out).unwrap_err();
        assert!(matches!(err, TranscodeError::InvalidData { .. }));
    }

    #[test]
    fn quotes_are_ordinary_bytes() {
        let (out, _) = run("a,b,c\n\"x,y\",z,w,extra\n").unwrap();
        assert_eq!(out, "\"x,y\",z\n");
    }

    #[test]
    fn normalizing_cleaned_output_is_a_no_op() {
        let (first, _) = run("a,b,c\n\n1,2,3,,,\n,,\nx,y,z,q\n").unwrap();
        let (second, stats) = run(&format!("a,b,c\n{first}")).unwrap();
        assert_eq!(first, second);
        assert_eq!(stats.records_truncated, 0);
    }

    #[test]
    fn non_utf8_header_is_invalid_header() {
        let err = normalize(&b"a,\xff,c\n1,2,3\n"[..], &HEADER, Vec::<u8>::new()).unwrap_err();
        match err {
            TranscodeError::InvalidHeader { line } => assert_eq!(line, "a,\u{fffd},c"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn carriage_return_in_leading_field_is_kept() {
        let mut out = Vec::new();
        let stats = normalize("a,b\n1\r2,3\r\n".as_bytes(), &["a", "b"], &mut out).unwrap();
        assert_eq!(out, b"1\r2,3\n");
        assert_eq!(stats.records, 1);
    }

    #[test]
    fn single_column_with_only_trailing_fields_is_an_empty_record() {
        let mut out = Vec::new();
        let stats = normalize("a\n1\n,extra\n2\n".as_bytes(), &["a"], &mut out).unwrap();
        assert_eq!(out, b"1\n\n2\n");
        assert_eq!(stats.records, 3);
        assert_eq!(stats.records_truncated, 1);
    }

    #[test]
    fn empty_expected_header_is_a_config_error() {
        let empty: [&str; 0] = [];
        let err = normalize("a\n".as_bytes(), &empty, Vec::<u8>::new()).unwrap_err();
        assert!(matches!(err, TranscodeError::InvalidConfig { .. }));
    }
}
