//! End-to-end transcoding: normalize → encode, optionally reported to an observer.
//!
//! Most callers should use [`transcode_from_path`] or [`transcode`]. Both:
//!
//! - validate the [`TranscodeConfig`] before reading any input
//! - run the normalizer and the encoder, either one after the other
//!   ([`ExecutionMode::Sequential`]) or as a producer/consumer pair over a bounded buffer
//!   ([`ExecutionMode::Pipelined`])
//! - return either a complete [`Table`] or the first error in input order, never a partial table
//! - hand the outcome to [`TranscodeOptions::observer`] if one is set, as a
//!   [`TranscodeEvent`]; a run that had to drop trailing fields is a
//!   [`TranscodeSeverity::Warning`]
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use strict_csv_transcode::config::TranscodeConfig;
//! use strict_csv_transcode::pipeline::{transcode_from_path, StdErrObserver, TranscodeOptions};
//!
//! # fn main() -> Result<(), strict_csv_transcode::TranscodeError> {
//! let opts = TranscodeOptions {
//!     observer: Some(Arc::new(StdErrObserver)),
//!     ..Default::default()
//! };
//! let out = transcode_from_path("green_tripdata_2013-09.csv", &TranscodeConfig::green_taxi(), &opts)?;
//! println!("rows={}", out.table.row_count());
//! # Ok(())
//! # }
//! ```

mod buffer;
mod observability;

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::TranscodeConfig;
use crate::encode::encode;
use crate::error::{TranscodeError, TranscodeResult};
use crate::export::TableSink;
use crate::normalize::{normalize, NormalizeStats};
use crate::types::Table;

pub use observability::{
    CompositeObserver, FailurePoint, FileObserver, StdErrObserver, TranscodeContext,
    TranscodeEvent, TranscodeObserver, TranscodeSeverity,
};

use buffer::{ChunkQueue, QueueReader, QueueWriter};

/// How the normalizer and encoder are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Normalize the whole input into memory, then encode it.
    Sequential,
    /// Normalize on a producer thread while the calling thread encodes.
    Pipelined {
        /// Chunks that may wait in the buffer before the producer blocks.
        max_buffered_chunks: usize,
        /// Approximate size of one chunk of cleaned lines.
        chunk_bytes: usize,
    },
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Sequential
    }
}

impl ExecutionMode {
    /// Pipelined mode with a 16 x 64 KiB buffer.
    pub fn pipelined() -> Self {
        Self::Pipelined {
            max_buffered_chunks: 16,
            chunk_bytes: 64 * 1024,
        }
    }
}

/// Options controlling a transcoding run.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct TranscodeOptions {
    /// Scheduling of the two passes.
    pub mode: ExecutionMode,
    /// Receives one [`TranscodeEvent`] per run.
    pub observer: Option<Arc<dyn TranscodeObserver>>,
    /// Lowest event severity that also triggers [`TranscodeObserver::on_alert`].
    pub alert_at_or_above: TranscodeSeverity,
}

impl fmt::Debug for TranscodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscodeOptions")
            .field("mode", &self.mode)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            observer: None,
            alert_at_or_above: TranscodeSeverity::Critical,
        }
    }
}

/// Counters for a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscodeStats {
    /// Rows in the produced table.
    pub rows: usize,
    /// Blank lines skipped between header and data.
    pub blank_lines_skipped: u64,
    /// Records whose trailing extra fields were dropped.
    pub records_truncated: u64,
}

impl fmt::Display for TranscodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows={} blank_lines_skipped={} records_truncated={}",
            self.rows, self.blank_lines_skipped, self.records_truncated
        )
    }
}

/// A finished table plus run counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeOutput {
    pub table: Table,
    pub stats: TranscodeStats,
}

/// Transcode a file at `path`.
pub fn transcode_from_path(
    path: impl AsRef<Path>,
    config: &TranscodeConfig,
    options: &TranscodeOptions,
) -> TranscodeResult<TranscodeOutput> {
    let path = path.as_ref();
    let result = File::open(path)
        .map_err(TranscodeError::from)
        .and_then(|file| run(BufReader::new(file), config, options.mode));
    report(&path.display().to_string(), options, &result);
    result
}

/// Transcode an already-open byte stream.
pub fn transcode<R: BufRead + Send>(
    input: R,
    config: &TranscodeConfig,
    options: &TranscodeOptions,
) -> TranscodeResult<TranscodeOutput> {
    let result = run(input, config, options.mode);
    report("<stream>", options, &result);
    result
}

fn run<R: BufRead + Send>(
    input: R,
    config: &TranscodeConfig,
    mode: ExecutionMode,
) -> TranscodeResult<TranscodeOutput> {
    config.validate()?;
    let encode_options = config.encode_options();

    let (normalized, encoded) = match mode {
        ExecutionMode::Sequential => {
            let mut cleaned = Vec::new();
            let normalized = normalize(input, &config.header, &mut cleaned);
            // The cleaned prefix is still encoded after a normalizer failure so that an earlier
            // conversion error is reported first, as in pipelined mode.
            let encoded = encode(cleaned.as_slice(), &config.schema, &encode_options);
            (normalized, encoded)
        }
        ExecutionMode::Pipelined {
            max_buffered_chunks,
            chunk_bytes,
        } => {
            if max_buffered_chunks == 0 || chunk_bytes == 0 {
                return Err(TranscodeError::config(
                    "pipelined mode needs max_buffered_chunks > 0 and chunk_bytes > 0",
                ));
            }
            let queue = ChunkQueue::new(max_buffered_chunks);
            let queue = &queue;
            std::thread::scope(|scope| {
                let producer = scope.spawn(move || {
                    let mut writer = QueueWriter::new(queue, chunk_bytes);
                    let normalized = normalize(input, &config.header, &mut writer);
                    // Lines cleaned before a failure still go to the encoder.
                    let sent = writer.finish();
                    let stats = normalized?;
                    sent?;
                    Ok::<_, TranscodeError>(stats)
                });
                let encoded = encode(QueueReader::new(queue), &config.schema, &encode_options);
                let normalized = producer
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                (normalized, encoded)
            })
        }
    };

    combine(normalized, encoded)
}

/// Pick the outcome of a run from both passes.
///
/// The encoder only ever sees lines that precede a normalizer failure, so its error (if any) is
/// the earlier one. On success every cleaned record must have become exactly one row.
fn combine(
    normalized: TranscodeResult<NormalizeStats>,
    encoded: TranscodeResult<Table>,
) -> TranscodeResult<TranscodeOutput> {
    let table = encoded?;
    let stats = normalized?;
    if stats.records != table.row_count() as u64 {
        return Err(TranscodeError::RowCountMismatch {
            records: stats.records,
            rows: table.row_count(),
        });
    }
    Ok(TranscodeOutput {
        stats: TranscodeStats {
            rows: table.row_count(),
            blank_lines_skipped: stats.blank_lines_skipped,
            records_truncated: stats.records_truncated,
        },
        table,
    })
}

fn report(source: &str, options: &TranscodeOptions, result: &TranscodeResult<TranscodeOutput>) {
    let Some(observer) = options.observer.as_deref() else {
        return;
    };
    let (event, failed_at) = match result {
        Ok(out) => (TranscodeEvent::Completed(out.stats), None),
        Err(e) => (TranscodeEvent::Failed(e), FailurePoint::of(e)),
    };
    let ctx = TranscodeContext {
        source: source.to_string(),
        mode: options.mode,
        failed_at,
    };

    observer.on_event(&ctx, &event);
    if let Some(severity) = event.severity().filter(|s| *s >= options.alert_at_or_above) {
        observer.on_alert(&ctx, severity, &event);
    }
}

/// An owned transcoding job: input path, config, options.
///
/// Useful for enqueueing work in a job system, or to run a whole source → sink transfer.
#[derive(Clone)]
pub struct TranscodeRequest {
    /// Path to the input file.
    pub path: PathBuf,
    /// Header/schema/token configuration.
    pub config: TranscodeConfig,
    /// Options controlling the run.
    pub options: TranscodeOptions,
}

impl fmt::Debug for TranscodeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscodeRequest")
            .field("path", &self.path)
            .field("schema_fields", &self.config.schema.len())
            .field("options", &self.options)
            .finish()
    }
}

impl TranscodeRequest {
    /// Execute the request by calling [`transcode_from_path`].
    pub fn run(&self) -> TranscodeResult<TranscodeOutput> {
        transcode_from_path(&self.path, &self.config, &self.options)
    }

    /// Execute the request and hand the finished table to `sink`.
    ///
    /// The sink is only called when the whole input transcoded successfully.
    pub fn run_into<S: TableSink + ?Sized>(&self, sink: &mut S) -> TranscodeResult<TranscodeStats> {
        let out = self.run()?;
        sink.write_table(&out.table)?;
        Ok(out.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::combine;
    use crate::error::{ConversionKind, TranscodeError};
    use crate::normalize::NormalizeStats;
    use crate::types::{Column, ColumnData, Field, LogicalType, Schema, Table};

    fn one_row_table() -> Table {
        Table::try_new(
            Schema::new(vec![Field::new("a", LogicalType::Bool)]),
            vec![Column::new("a", ColumnData::Bool(vec![Some(true)]))],
        )
        .unwrap()
    }

    fn conversion_error() -> TranscodeError {
        TranscodeError::Conversion {
            column: "a".to_string(),
            row: 0,
            raw: "x".to_string(),
            kind: ConversionKind::InvalidToken,
            message: "bad".to_string(),
        }
    }

    fn one_record(records: u64) -> NormalizeStats {
        NormalizeStats {
            records,
            blank_lines_skipped: 2,
            records_truncated: 1,
        }
    }

    #[test]
    fn encoder_error_wins_over_normalizer_error() {
        let normalized = Err(TranscodeError::InvalidData {
            line: "1".to_string(),
            line_number: 9,
        });
        let err = combine(normalized, Err(conversion_error())).unwrap_err();
        assert!(matches!(err, TranscodeError::Conversion { .. }));
    }

    #[test]
    fn normalizer_error_discards_partial_table() {
        let normalized = Err(TranscodeError::InvalidData {
            line: "1".to_string(),
            line_number: 9,
        });
        let err = combine(normalized, Ok(one_row_table())).unwrap_err();
        assert!(matches!(err, TranscodeError::InvalidData { line_number: 9, .. }));
    }

    #[test]
    fn stats_combine_both_passes() {
        let out = combine(Ok(one_record(1)), Ok(one_row_table())).unwrap();
        assert_eq!(out.stats.rows, 1);
        assert_eq!(out.stats.blank_lines_skipped, 2);
        assert_eq!(out.stats.records_truncated, 1);
    }

    #[test]
    fn lost_rows_are_an_error() {
        let err = combine(Ok(one_record(2)), Ok(one_row_table())).unwrap_err();
        assert!(matches!(
            err,
            TranscodeError::RowCountMismatch { records: 2, rows: 1 }
        ));
    }
}
