//! Core data model types.
//!
//! A [`Schema`] (an ordered list of typed [`Field`]s) drives both normalization and encoding.
//! Encoding produces a columnar [`Table`] whose [`Column`]s hold exactly-typed values.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TranscodeError, TranscodeResult};

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogicalType {
    /// 16-bit signed integer.
    SmallInt,
    /// Local wall-clock timestamp with second precision, stored normalized to UTC.
    TimestampLocal,
    /// Boolean.
    Bool,
    /// Exact base-10 fixed-point number with `precision` total digits, `scale` of them fractional.
    Decimal { precision: u8, scale: u8 },
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SmallInt => f.write_str("smallint"),
            Self::TimestampLocal => f.write_str("timestamp"),
            Self::Bool => f.write_str("bool"),
            Self::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
        }
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field logical type.
    pub logical_type: LogicalType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
        }
    }
}

/// An ordered list of fields describing the exact shape of cleaned records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Check the schema invariants: at least one field, unique names, and every decimal
    /// declaring `0 < precision <= 38` with `scale <= precision`.
    pub fn validate(&self) -> TranscodeResult<()> {
        if self.fields.is_empty() {
            return Err(TranscodeError::config("schema has no fields"));
        }

        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(TranscodeError::config(format!(
                    "duplicate column name '{}'",
                    field.name
                )));
            }
            if let LogicalType::Decimal { precision, scale } = field.logical_type {
                if precision == 0 || precision > Decimal::MAX_PRECISION {
                    return Err(TranscodeError::config(format!(
                        "column '{}': decimal precision {precision} not in 1..={}",
                        field.name,
                        Decimal::MAX_PRECISION
                    )));
                }
                if scale > precision {
                    return Err(TranscodeError::config(format!(
                        "column '{}': decimal scale {scale} exceeds precision {precision}",
                        field.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Scaled-integer decimal: `mantissa / 10^scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i128,
    scale: u8,
}

impl Decimal {
    /// Largest precision whose values always fit an `i128` mantissa.
    pub const MAX_PRECISION: u8 = 38;

    /// Create a decimal from its unscaled mantissa and scale.
    pub fn new(mantissa: i128, scale: u8) -> Self {
        Self { mantissa, scale }
    }

    /// Unscaled integer value.
    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    /// Number of fractional digits.
    pub fn scale(&self) -> u8 {
        self.scale
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let digits = self.mantissa.unsigned_abs().to_string();
        let scale = usize::from(self.scale);
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

/// A single typed cell of a [`Table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 16-bit signed integer.
    SmallInt(i16),
    /// UTC-normalized timestamp.
    Timestamp(DateTime<Utc>),
    /// Boolean.
    Bool(bool),
    /// Exact decimal.
    Decimal(Decimal),
}

/// Homogeneous typed storage for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnData {
    SmallInt(Vec<Option<i16>>),
    Timestamp(Vec<Option<DateTime<Utc>>>),
    Bool(Vec<Option<bool>>),
    /// Decimal mantissas sharing one precision/scale.
    Decimal {
        precision: u8,
        scale: u8,
        values: Vec<Option<i128>>,
    },
}

impl ColumnData {
    /// Empty storage for `logical_type` with room for `capacity` values.
    pub fn with_capacity(logical_type: LogicalType, capacity: usize) -> Self {
        match logical_type {
            LogicalType::SmallInt => Self::SmallInt(Vec::with_capacity(capacity)),
            LogicalType::TimestampLocal => Self::Timestamp(Vec::with_capacity(capacity)),
            LogicalType::Bool => Self::Bool(Vec::with_capacity(capacity)),
            LogicalType::Decimal { precision, scale } => Self::Decimal {
                precision,
                scale,
                values: Vec::with_capacity(capacity),
            },
        }
    }

    /// Logical type of the stored values.
    pub fn logical_type(&self) -> LogicalType {
        match self {
            Self::SmallInt(_) => LogicalType::SmallInt,
            Self::Timestamp(_) => LogicalType::TimestampLocal,
            Self::Bool(_) => LogicalType::Bool,
            Self::Decimal {
                precision, scale, ..
            } => LogicalType::Decimal {
                precision: *precision,
                scale: *scale,
            },
        }
    }

    /// Number of stored values (nulls included).
    pub fn len(&self) -> usize {
        match self {
            Self::SmallInt(v) => v.len(),
            Self::Timestamp(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Decimal { values, .. } => values.len(),
        }
    }

    /// Returns `true` if the column holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of null cells.
    pub fn null_count(&self) -> usize {
        match self {
            Self::SmallInt(v) => v.iter().filter(|x| x.is_none()).count(),
            Self::Timestamp(v) => v.iter().filter(|x| x.is_none()).count(),
            Self::Bool(v) => v.iter().filter(|x| x.is_none()).count(),
            Self::Decimal { values, .. } => values.iter().filter(|x| x.is_none()).count(),
        }
    }

    /// Typed view of the value at `row`, or `None` if out of bounds.
    pub fn value(&self, row: usize) -> Option<Value> {
        let v = match self {
            Self::SmallInt(v) => v.get(row)?.map(Value::SmallInt),
            Self::Timestamp(v) => v.get(row)?.map(Value::Timestamp),
            Self::Bool(v) => v.get(row)?.map(Value::Bool),
            Self::Decimal { scale, values, .. } => values
                .get(row)?
                .map(|m| Value::Decimal(Decimal::new(m, *scale))),
        };
        Some(v.unwrap_or(Value::Null))
    }
}

/// A named column of a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name (same as the schema field).
    pub name: String,
    /// Typed values.
    pub data: ColumnData,
}

impl Column {
    /// Create a column.
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the column holds no values.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// In-memory columnar table.
///
/// Columns are stored in schema order and always have the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    schema: Schema,
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Build a table, checking that the columns line up with `schema` (names, types and order)
    /// and that every column has the same length.
    pub fn try_new(schema: Schema, columns: Vec<Column>) -> TranscodeResult<Self> {
        if columns.len() != schema.len() {
            return Err(TranscodeError::config(format!(
                "table has {} columns but schema declares {}",
                columns.len(),
                schema.len()
            )));
        }

        let row_count = columns.first().map(Column::len).unwrap_or(0);
        for (field, column) in schema.fields.iter().zip(&columns) {
            if field.name != column.name || field.logical_type != column.data.logical_type() {
                return Err(TranscodeError::config(format!(
                    "column '{}' ({}) does not match schema field '{}' ({})",
                    column.name,
                    column.data.logical_type(),
                    field.name,
                    field.logical_type
                )));
            }
            if column.len() != row_count {
                return Err(TranscodeError::config(format!(
                    "column '{}' has {} values, expected {row_count}",
                    column.name,
                    column.len()
                )));
            }
        }

        Ok(Self {
            schema,
            columns,
            row_count,
        })
    }

    /// Schema the table was encoded with.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Columns in schema order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of rows (identical across columns).
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.schema.index_of(name).map(|idx| &self.columns[idx])
    }

    /// Typed cell at (`row`, `column`).
    pub fn value(&self, row: usize, column: &str) -> Option<Value> {
        self.column(column)?.data.value(row)
    }

    /// All cells of `row` in schema order.
    pub fn row(&self, row: usize) -> Option<Vec<Value>> {
        if row >= self.row_count {
            return None;
        }
        self.columns.iter().map(|c| c.data.value(row)).collect()
    }
}
