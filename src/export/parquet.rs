//! Parquet sink.
//!
//! Physical/logical type mapping (every column is `OPTIONAL`, nulls are definition level 0):
//!
//! | logical type       | Parquet                                                   |
//! |--------------------|-----------------------------------------------------------|
//! | `SmallInt`         | `INT32` + `INTEGER(16, true)`                             |
//! | `TimestampLocal`   | `INT64` + `TIMESTAMP(MILLIS, true)` (UTC)                 |
//! | `Bool`             | `BOOLEAN`                                                 |
//! | `Decimal(p, s)`    | `FIXED_LEN_BYTE_ARRAY(n)` + `DECIMAL(p, s)`, minimal `n`  |

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parquet::data_type::{
    BoolType, ByteArray, FixedLenByteArray, FixedLenByteArrayType, Int32Type, Int64Type,
};
use parquet::file::properties::{WriterProperties, WriterVersion};
use parquet::file::writer::{SerializedColumnWriter, SerializedFileWriter};
use parquet::schema::parser::parse_message_type;

use crate::error::{TranscodeError, TranscodeResult};
use crate::types::{ColumnData, LogicalType, Schema, Table};

use super::TableSink;

/// Writes one table as a single-row-group Parquet file.
pub struct ParquetSink<W: Write + Send> {
    writer: Option<W>,
    properties: Arc<WriterProperties>,
    written: bool,
}

impl ParquetSink<File> {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> TranscodeResult<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write + Send> ParquetSink<W> {
    /// Wrap an output stream. Format version 2.0 is used unless overridden.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            properties: Arc::new(
                WriterProperties::builder()
                    .set_writer_version(WriterVersion::PARQUET_2_0)
                    .build(),
            ),
            written: false,
        }
    }

    /// Use custom writer properties (compression, row group size, ...).
    pub fn with_properties(mut self, properties: WriterProperties) -> Self {
        self.properties = Arc::new(properties);
        self
    }

    /// Return the underlying stream.
    pub fn into_inner(self) -> Option<W> {
        self.writer
    }
}

impl<W: Write + Send> TableSink for ParquetSink<W> {
    fn write_table(&mut self, table: &Table) -> TranscodeResult<()> {
        if self.written {
            return Err(TranscodeError::config("parquet sink already holds a table"));
        }
        let out = self
            .writer
            .take()
            .ok_or_else(|| TranscodeError::config("parquet sink has no output stream"))?;
        self.written = true;
        self.writer = Some(write_parquet(out, table, Arc::clone(&self.properties))?);
        Ok(())
    }
}

/// Write `table` to a new Parquet file at `path`.
pub fn write_table_to_parquet(table: &Table, path: impl AsRef<Path>) -> TranscodeResult<()> {
    ParquetSink::create(path)?.write_table(table)
}

/// Smallest byte width whose signed two's complement range holds every `DECIMAL(precision, _)`
/// mantissa, i.e. `10^precision - 1`.
pub fn decimal_byte_width(precision: u8) -> usize {
    let max = 10u128.pow(u32::from(precision.min(38))) - 1;
    (1..16).find(|&n| max < 1u128 << (8 * n - 1)).unwrap_or(16)
}

fn write_parquet<W: Write + Send>(
    out: W,
    table: &Table,
    properties: Arc<WriterProperties>,
) -> TranscodeResult<W> {
    let schema = Arc::new(parse_message_type(&message_type(table.schema())?)?);
    let mut writer = SerializedFileWriter::new(out, schema, properties)?;

    let mut row_group = writer.next_row_group()?;
    let mut columns = table.columns().iter();
    while let Some(mut column_writer) = row_group.next_column()? {
        let column = columns.next().ok_or_else(|| {
            TranscodeError::config("parquet schema has more columns than the table")
        })?;
        write_column(&mut column_writer, &column.data)?;
        column_writer.close()?;
    }
    row_group.close()?;

    Ok(writer.into_inner()?)
}

fn message_type(schema: &Schema) -> TranscodeResult<String> {
    let mut out = String::from("message schema {\n");
    for field in &schema.fields {
        let name = field.name.as_str();
        if !is_plain_identifier(name) {
            return Err(TranscodeError::config(format!(
                "column name '{name}' cannot be used as a parquet field name"
            )));
        }
        let line = match field.logical_type {
            LogicalType::SmallInt => format!("OPTIONAL INT32 {name} (INTEGER(16,true));"),
            LogicalType::TimestampLocal => {
                format!("OPTIONAL INT64 {name} (TIMESTAMP(MILLIS,true));")
            }
            LogicalType::Bool => format!("OPTIONAL BOOLEAN {name};"),
            LogicalType::Decimal { precision, scale } => format!(
                "OPTIONAL FIXED_LEN_BYTE_ARRAY ({}) {name} (DECIMAL({precision},{scale}));",
                decimal_byte_width(precision)
            ),
        };
        out.push_str("  ");
        out.push_str(&line);
        out.push('\n');
    }
    out.push('}');
    Ok(out)
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn write_column(writer: &mut SerializedColumnWriter<'_>, data: &ColumnData) -> TranscodeResult<()> {
    match data {
        ColumnData::SmallInt(v) => {
            let (values, defs) = split_nulls(v.as_slice(), i32::from);
            writer
                .typed::<Int32Type>()
                .write_batch(&values, Some(defs.as_slice()), None)?;
        }
        ColumnData::Timestamp(v) => {
            let (values, defs) = split_nulls(v.as_slice(), |ts: DateTime<Utc>| ts.timestamp_millis());
            writer
                .typed::<Int64Type>()
                .write_batch(&values, Some(defs.as_slice()), None)?;
        }
        ColumnData::Bool(v) => {
            let (values, defs) = split_nulls(v.as_slice(), |b| b);
            writer
                .typed::<BoolType>()
                .write_batch(&values, Some(defs.as_slice()), None)?;
        }
        ColumnData::Decimal {
            precision, values, ..
        } => {
            let width = decimal_byte_width(*precision);
            let (values, defs) = split_nulls(values.as_slice(), |m| {
                FixedLenByteArray::from(ByteArray::from(fixed_be_bytes(m, width)))
            });
            writer
                .typed::<FixedLenByteArrayType>()
                .write_batch(&values, Some(defs.as_slice()), None)?;
        }
    }
    Ok(())
}

/// Non-null values plus one definition level per row.
fn split_nulls<T: Copy, U>(values: &[Option<T>], convert: impl Fn(T) -> U) -> (Vec<U>, Vec<i16>) {
    let mut out = Vec::with_capacity(values.len());
    let mut defs = Vec::with_capacity(values.len());
    for v in values {
        match v {
            Some(x) => {
                out.push(convert(*x));
                defs.push(1);
            }
            None => defs.push(0),
        }
    }
    (out, defs)
}

/// Big-endian two's complement, truncated to the low `width` bytes.
fn fixed_be_bytes(mantissa: i128, width: usize) -> Vec<u8> {
    let bytes = mantissa.to_be_bytes();
    bytes[bytes.len() - width..].to_vec()
}
