use std::error::Error as StdError;
use std::fmt;
use std::iter;

use thiserror::Error;

/// Convenience result type for transcoding operations.
pub type TranscodeResult<T> = Result<T, TranscodeError>;

/// Why a single cell could not be converted into its declared logical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    /// The token does not have the shape the logical type requires.
    InvalidToken,
    /// The token is well-shaped but its magnitude or precision does not fit the declared type.
    OutOfRange,
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken => f.write_str("invalid token"),
            Self::OutOfRange => f.write_str("out of range"),
        }
    }
}

/// Error type returned by normalization, encoding and sinks.
///
/// Every variant is fatal for the run: nothing is retried and no partial table is produced.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// Underlying I/O error (e.g. file not found, broken pipe).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader error raised while splitting cleaned records.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet sink error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Configuration could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration (schema, header list, token sets) violates an invariant.
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    /// The first line does not exactly match the expected header.
    #[error("invalid header: {line:?}")]
    InvalidHeader { line: String },

    /// A data line does not carry the required number of leading fields.
    #[error("invalid data at line {line_number}: {line:?}")]
    InvalidData { line: String, line_number: u64 },

    /// A field could not be converted into its declared logical type.
    #[error("failed to convert value at row {row} column '{column}': {kind}: {message} (raw='{raw}')")]
    Conversion {
        column: String,
        row: usize,
        raw: String,
        kind: ConversionKind,
        message: String,
    },

    /// The encoder produced a different number of rows than the normalizer emitted records.
    #[error("normalizer emitted {records} records but the encoder produced {rows} rows")]
    RowCountMismatch { records: u64, rows: usize },
}

impl TranscodeError {
    /// `true` if the failure came from the underlying stream rather than from the data.
    pub fn is_io(&self) -> bool {
        // csv errors do not expose their io error as a source.
        if let Self::Csv(e) = self {
            return matches!(e.kind(), csv::ErrorKind::Io(_));
        }
        iter::successors(Some(self as &(dyn StdError + 'static)), |&e| e.source())
            .any(|e| e.is::<std::io::Error>())
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::TranscodeError;

    #[test]
    fn io_is_found_through_wrappers() {
        assert!(TranscodeError::Io(io::Error::other("gone")).is_io());

        let parquet = parquet::errors::ParquetError::External(Box::new(io::Error::other("gone")));
        assert!(TranscodeError::Parquet(parquet).is_io());

        let header = TranscodeError::InvalidHeader { line: String::new() };
        assert!(!header.is_io());
    }
}
