//! `strict-csv-transcode` turns a semi-structured comma-separated byte stream into a validated,
//! exactly-typed columnar [`types::Table`].
//!
//! The most common entrypoint is [`pipeline::transcode_from_path`], which runs the two stages
//! below back to back and returns either a complete table or the first error.
//!
//! ## Stages
//!
//! 1. **Normalization** ([`normalize::normalize`]): the first line must equal the expected header
//!    exactly; blank lines before the first record are skipped; every record is cut down to its
//!    first `H` fields (trailing extra fields are dropped, missing ones are an error).
//! 2. **Encoding** ([`encode::encode`]): every cleaned cell is converted into its column's
//!    [`types::LogicalType`]:
//!
//!    - [`types::LogicalType::SmallInt`]: 16-bit signed integer
//!    - [`types::LogicalType::TimestampLocal`]: wall-clock time in a configured timezone,
//!      stored as UTC
//!    - [`types::LogicalType::Bool`]: configured true/false tokens (`Y` / `N` by default)
//!    - [`types::LogicalType::Decimal`]: exact scaled integer, never via floating point
//!
//! The finished table can be handed to a [`export::TableSink`], e.g. [`export::ParquetSink`].
//!
//! ## Errors
//!
//! Everything is fail-fast and surfaces as a [`TranscodeError`]:
//!
//! - [`TranscodeError::InvalidHeader`]: the first line is not the expected header
//! - [`TranscodeError::InvalidData`]: a record has too few fields (carries the raw line)
//! - [`TranscodeError::Conversion`]: a cell does not fit its type (carries column, row, token)
//!
//! ## Example
//!
//! ```rust
//! use strict_csv_transcode::config::TranscodeConfig;
//! use strict_csv_transcode::pipeline::{transcode, TranscodeOptions};
//! use strict_csv_transcode::types::{Decimal, Field, LogicalType, Schema, Value};
//!
//! let config = TranscodeConfig::new(
//!     ["id", "paid", "amount"],
//!     Schema::new(vec![
//!         Field::new("id", LogicalType::SmallInt),
//!         Field::new("paid", LogicalType::Bool),
//!         Field::new("amount", LogicalType::Decimal { precision: 6, scale: 2 }),
//!     ]),
//! );
//!
//! // One blank line after the header, and two trailing empty fields on the record.
//! let input = "id,paid,amount\n\n7,Y,12.50,,\n";
//! let out = transcode(input.as_bytes(), &config, &TranscodeOptions::default()).unwrap();
//!
//! assert_eq!(out.table.row_count(), 1);
//! assert_eq!(out.stats.records_truncated, 1);
//! assert_eq!(
//!     out.table.row(0).unwrap(),
//!     vec![
//!         Value::SmallInt(7),
//!         Value::Bool(true),
//!         Value::Decimal(Decimal::new(1250, 2)),
//!     ]
//! );
//! ```
//!
//! ## Modules
//!
//! - [`config`]: header/schema/token configuration, including the green taxi reference instance
//! - [`normalize`]: header check and trailing-field truncation
//! - [`encode`]: typed columnar conversion
//! - [`pipeline`]: sequential or pipelined end-to-end runs with observer hooks
//! - [`export`]: table sinks (Parquet)
//! - [`types`]: schema, decimal and table types
//! - [`error`]: error type shared by every stage

pub mod config;
pub mod encode;
pub mod error;
pub mod export;
pub mod normalize;
pub mod pipeline;
pub mod types;

pub use error::{ConversionKind, TranscodeError, TranscodeResult};
