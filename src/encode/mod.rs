//! Typed columnar encoding of cleaned records.
//!
//! [`encode`] reads the output of [`crate::normalize`] (comma-separated, newline-terminated,
//! no header row, no quoting) and converts every cell into its column's [`LogicalType`]:
//!
//! - tokens listed in [`TokenSets::null_values`] become null for every type
//! - [`LogicalType::SmallInt`]: base-10 `i16`
//! - [`LogicalType::TimestampLocal`]: [`EncodeOptions::timestamp_format`] in
//!   [`EncodeOptions::timezone`], normalized to UTC
//! - [`LogicalType::Bool`]: [`TokenSets::true_values`] / [`TokenSets::false_values`]
//! - [`LogicalType::Decimal`]: exact scaled integer, never via floating point
//!
//! Tokens are matched exactly; nothing is trimmed or case-folded.

mod decimal;
mod timestamp;

use std::io::{self, Read};
use std::num::IntErrorKind;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{ConversionKind, TranscodeError, TranscodeResult};
use crate::types::{Column, ColumnData, Field, LogicalType, Schema, Table};

use decimal::parse_decimal;
use timestamp::parse_timestamp;

/// Timestamp pattern of the reference data (`YYYY-MM-DD HH:MM:SS`).
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timezone the reference data's wall-clock timestamps are recorded in.
pub const DEFAULT_TIMEZONE: Tz = Tz::America__New_York;

/// Token sets recognized during conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSets {
    /// Tokens read as null in any column.
    pub null_values: Vec<String>,
    /// Tokens read as `true` in boolean columns.
    pub true_values: Vec<String>,
    /// Tokens read as `false` in boolean columns.
    pub false_values: Vec<String>,
}

impl Default for TokenSets {
    fn default() -> Self {
        Self {
            null_values: vec![String::new()],
            true_values: vec!["Y".to_string()],
            false_values: vec!["N".to_string()],
        }
    }
}

/// How to resolve a local time that occurs twice (daylight-saving fall-back).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguousTime {
    /// Use the first occurrence (the earlier UTC instant).
    #[default]
    Earliest,
    /// Use the second occurrence.
    Latest,
    /// Treat the cell as a conversion error.
    Reject,
}

/// Options controlling cell conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOptions {
    /// Timezone of wall-clock timestamps in the source.
    pub timezone: Tz,
    /// `chrono` format string for timestamp cells.
    pub timestamp_format: String,
    /// Null/true/false token sets.
    pub tokens: TokenSets,
    /// Resolution of ambiguous local times.
    pub ambiguous_time: AmbiguousTime,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            tokens: TokenSets::default(),
            ambiguous_time: AmbiguousTime::default(),
        }
    }
}

/// Encode a cleaned record stream into a [`Table`].
///
/// Rules:
///
/// - There is no header row; column `i` of every record is schema field `i`.
/// - Records end at `\n` only; `"` and `\r` are ordinary bytes.
/// - Every line is a record, including an empty one (a single empty field). A final line
///   without `\n` is a record too.
/// - A record with a different number of fields than the schema is
///   [`TranscodeError::InvalidData`], with its 1-based line number in `input`.
/// - The first cell that fails to convert aborts encoding with [`TranscodeError::Conversion`];
///   its `row` is the zero-based record index.
pub fn encode<R: Read>(input: R, schema: &Schema, options: &EncodeOptions) -> TranscodeResult<Table> {
    schema.validate()?;

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_reader(NewlineTerminated::new(input));

    let mut builders: Vec<ColumnBuilder<'_>> = schema
        .fields
        .iter()
        .map(|field| ColumnBuilder::new(field, options))
        .collect();

    let mut record = csv::ByteRecord::new();
    let mut row = 0usize;
    let mut line_number = rdr.position().line();
    loop {
        let more = rdr.read_byte_record(&mut record)?;

        // The csv reader skips empty lines without yielding a record; its line counter still
        // advances past them. Every line ends in `\n`, so a record consumes exactly one line
        // beyond the empty ones before it.
        let consumed = rdr.position().line() - line_number;
        let empty_lines = if more { consumed.saturating_sub(1) } else { consumed };
        for _ in 0..empty_lines {
            if builders.len() != 1 {
                return Err(TranscodeError::InvalidData {
                    line: String::new(),
                    line_number,
                });
            }
            builders[0].push(row, b"")?;
            row += 1;
            line_number += 1;
        }
        if !more {
            break;
        }

        if record.len() != builders.len() {
            let fields: Vec<&[u8]> = record.iter().collect();
            return Err(TranscodeError::InvalidData {
                line: String::from_utf8_lossy(&fields.join(&b","[..])).into_owned(),
                line_number,
            });
        }
        for (builder, raw) in builders.iter_mut().zip(record.iter()) {
            builder.push(row, raw)?;
        }
        row += 1;
        line_number += 1;
    }

    let columns = builders.into_iter().map(ColumnBuilder::finish).collect();
    Table::try_new(schema.clone(), columns)
}

/// Appends a `\n` to a stream whose last byte is something else.
struct NewlineTerminated<R> {
    inner: R,
    last: Option<u8>,
    done: bool,
}

impl<R: Read> NewlineTerminated<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            last: None,
            done: false,
        }
    }
}

impl<R: Read> Read for NewlineTerminated<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.last = Some(buf[n - 1]);
            return Ok(n);
        }
        self.done = true;
        match self.last {
            Some(b) if b != b'\n' => {
                buf[0] = b'\n';
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

/// Reason a single token failed to convert, before the column/row context is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CellError {
    pub(crate) kind: ConversionKind,
    pub(crate) message: String,
}

impl CellError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self {
            kind: ConversionKind::InvalidToken,
            message: message.into(),
        }
    }

    pub(crate) fn out_of_range(message: impl Into<String>) -> Self {
        Self {
            kind: ConversionKind::OutOfRange,
            message: message.into(),
        }
    }
}

struct ColumnBuilder<'a> {
    field: &'a Field,
    options: &'a EncodeOptions,
    data: ColumnData,
}

impl<'a> ColumnBuilder<'a> {
    fn new(field: &'a Field, options: &'a EncodeOptions) -> Self {
        Self {
            field,
            options,
            data: ColumnData::with_capacity(field.logical_type, 0),
        }
    }

    fn push(&mut self, row: usize, raw: &[u8]) -> TranscodeResult<()> {
        self.push_token(raw).map_err(|e| TranscodeError::Conversion {
            column: self.field.name.clone(),
            row,
            raw: String::from_utf8_lossy(raw).into_owned(),
            kind: e.kind,
            message: e.message,
        })
    }

    fn push_token(&mut self, raw: &[u8]) -> Result<(), CellError> {
        let token = std::str::from_utf8(raw).map_err(|e| CellError::invalid(e.to_string()))?;
        let options = self.options;
        let is_null = options.tokens.null_values.iter().any(|n| n == token);

        match &mut self.data {
            ColumnData::SmallInt(values) => {
                let v = if is_null { None } else { Some(parse_small_int(token)?) };
                values.push(v);
            }
            ColumnData::Timestamp(values) => {
                let v = if is_null {
                    None
                } else {
                    Some(parse_timestamp(
                        token,
                        &options.timestamp_format,
                        options.timezone,
                        options.ambiguous_time,
                    )?)
                };
                values.push(v);
            }
            ColumnData::Bool(values) => {
                let v = if is_null {
                    None
                } else {
                    Some(parse_bool(token, &options.tokens)?)
                };
                values.push(v);
            }
            ColumnData::Decimal {
                precision,
                scale,
                values,
            } => {
                let v = if is_null {
                    None
                } else {
                    Some(parse_decimal(token, *precision, *scale)?)
                };
                values.push(v);
            }
        }
        Ok(())
    }

    fn finish(self) -> Column {
        Column::new(self.field.name.clone(), self.data)
    }
}

fn parse_small_int(token: &str) -> Result<i16, CellError> {
    token.parse::<i16>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            CellError::out_of_range(format!("not in {}..={}", i16::MIN, i16::MAX))
        }
        _ => CellError::invalid(format!("expected integer: {e}")),
    })
}

fn parse_bool(token: &str, tokens: &TokenSets) -> Result<bool, CellError> {
    if tokens.true_values.iter().any(|t| t == token) {
        Ok(true)
    } else if tokens.false_values.iter().any(|t| t == token) {
        Ok(false)
    } else {
        Err(CellError::invalid(format!(
            "expected bool (true={:?}, false={:?})",
            tokens.true_values, tokens.false_values
        )))
    }
}
