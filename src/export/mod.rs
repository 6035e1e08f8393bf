//! Table sinks.
//!
//! A [`TableSink`] receives a finished [`Table`]; the transcoder never hands over a partial one.
//!
//! - [`parquet`]: columnar Parquet file writer preserving the exact logical types

pub mod parquet;

use crate::error::TranscodeResult;
use crate::types::Table;

pub use self::parquet::{decimal_byte_width, write_table_to_parquet, ParquetSink};

/// Destination for finished tables.
pub trait TableSink {
    /// Persist `table`.
    fn write_table(&mut self, table: &Table) -> TranscodeResult<()>;
}

impl<S: TableSink + ?Sized> TableSink for &mut S {
    fn write_table(&mut self, table: &Table) -> TranscodeResult<()> {
        (**self).write_table(table)
    }
}

/// Collects tables in memory, in write order.
impl TableSink for Vec<Table> {
    fn write_table(&mut self, table: &Table) -> TranscodeResult<()> {
        self.push(table.clone());
        Ok(())
    }
}
