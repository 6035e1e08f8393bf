//! Run reporting.
//!
//! Every run ends with exactly one [`TranscodeEvent`] delivered to
//! [`TranscodeObserver::on_event`]. If the event's severity reaches
//! [`super::TranscodeOptions::alert_at_or_above`], [`TranscodeObserver::on_alert`] follows.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::TranscodeError;

use super::{ExecutionMode, TranscodeStats};

/// Severity of a run outcome, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TranscodeSeverity {
    /// The run finished, but trailing fields were dropped from some records.
    Warning,
    /// The input or the configuration is wrong.
    Error,
    /// The input or output stream failed.
    Critical,
}

/// Where in the input a failed run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePoint {
    /// The first line.
    Header,
    /// A 1-based physical input line.
    Line(u64),
    /// A zero-based data row and its column.
    Cell { row: usize, column: String },
}

impl FailurePoint {
    /// The input position named by `error`, if it has one.
    pub fn of(error: &TranscodeError) -> Option<Self> {
        match error {
            TranscodeError::InvalidHeader { .. } => Some(Self::Header),
            TranscodeError::InvalidData { line_number, .. } => Some(Self::Line(*line_number)),
            TranscodeError::Conversion { row, column, .. } => Some(Self::Cell {
                row: *row,
                column: column.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for FailurePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => f.write_str("header"),
            Self::Line(n) => write!(f, "line {n}"),
            Self::Cell { row, column } => write!(f, "row {row} column '{column}'"),
        }
    }
}

/// Which input a run read, how it was scheduled, and where it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeContext {
    /// A path, or `"<stream>"`.
    pub source: String,
    pub mode: ExecutionMode,
    /// Set when the run failed at a known input position.
    pub failed_at: Option<FailurePoint>,
}

impl fmt::Display for TranscodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source={} mode={:?}", self.source, self.mode)?;
        if let Some(at) = &self.failed_at {
            write!(f, " at={at}")?;
        }
        Ok(())
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Copy)]
pub enum TranscodeEvent<'a> {
    /// A complete table was produced.
    Completed(TranscodeStats),
    /// The run stopped at its first error.
    Failed(&'a TranscodeError),
}

impl TranscodeEvent<'_> {
    /// `None` for a run that needed no repair.
    pub fn severity(&self) -> Option<TranscodeSeverity> {
        match self {
            Self::Completed(stats) if stats.records_truncated > 0 => {
                Some(TranscodeSeverity::Warning)
            }
            Self::Completed(_) => None,
            Self::Failed(e) if e.is_io() => Some(TranscodeSeverity::Critical),
            Self::Failed(_) => Some(TranscodeSeverity::Error),
        }
    }
}

impl fmt::Display for TranscodeEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(stats) => write!(f, "ok {stats}"),
            Self::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Receives the outcome of every run.
pub trait TranscodeObserver: Send + Sync {
    fn on_event(&self, ctx: &TranscodeContext, event: &TranscodeEvent<'_>);

    /// Called after [`Self::on_event`] when the event meets the alert threshold.
    fn on_alert(&self, _ctx: &TranscodeContext, _severity: TranscodeSeverity, _event: &TranscodeEvent<'_>) {}
}

/// Forwards every call to each of its observers, in order.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn TranscodeObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn TranscodeObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl TranscodeObserver for CompositeObserver {
    fn on_event(&self, ctx: &TranscodeContext, event: &TranscodeEvent<'_>) {
        self.observers.iter().for_each(|o| o.on_event(ctx, event));
    }

    fn on_alert(&self, ctx: &TranscodeContext, severity: TranscodeSeverity, event: &TranscodeEvent<'_>) {
        self.observers
            .iter()
            .for_each(|o| o.on_alert(ctx, severity, event));
    }
}

/// One log line: `[severity] context event`, severity omitted for clean runs.
fn log_line(ctx: &TranscodeContext, event: &TranscodeEvent<'_>) -> String {
    match event.severity() {
        Some(sev) => format!("[{sev:?}] {ctx} {event}"),
        None => format!("{ctx} {event}"),
    }
}

/// Logs run outcomes to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl TranscodeObserver for StdErrObserver {
    fn on_event(&self, ctx: &TranscodeContext, event: &TranscodeEvent<'_>) {
        eprintln!("[transcode] {}", log_line(ctx, event));
    }

    fn on_alert(&self, ctx: &TranscodeContext, _severity: TranscodeSeverity, event: &TranscodeEvent<'_>) {
        eprintln!("[transcode][ALERT] {}", log_line(ctx, event));
    }
}

/// Appends run outcomes to a log file, one line per call, prefixed with a unix timestamp.
///
/// Failures to open or write the file are ignored.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append(&self, tag: &str, ctx: &TranscodeContext, event: &TranscodeEvent<'_>) {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        let _guard = self.lock.lock();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{secs} {tag}{}", log_line(ctx, event));
        }
    }
}

impl TranscodeObserver for FileObserver {
    fn on_event(&self, ctx: &TranscodeContext, event: &TranscodeEvent<'_>) {
        self.append("", ctx, event);
    }

    fn on_alert(&self, ctx: &TranscodeContext, _severity: TranscodeSeverity, event: &TranscodeEvent<'_>) {
        self.append("ALERT ", ctx, event);
    }
}
