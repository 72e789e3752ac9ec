//! Append-only, timestamped run log

use chrono::Local;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Default run log location
pub const DEFAULT_LOG_FILE: &str = "patient_clustering.log";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Severity of a run log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
        }
    }
}

/// Sink for the results of a run, one `<timestamp> - <LEVEL> - <message>`
/// line per record.
#[derive(Debug)]
pub struct RunLog<W: Write> {
    sink: W,
}

impl RunLog<File> {
    /// Open (or create) a log file for appending
    pub fn append_to(path: impl AsRef<Path>) -> crate::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self::new(file))
    }
}

impl<W: Write> RunLog<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub fn info(&mut self, message: impl fmt::Display) -> crate::Result<()> {
        self.record(LogLevel::Info, message)
    }

    pub fn warning(&mut self, message: impl fmt::Display) -> crate::Result<()> {
        self.record(LogLevel::Warning, message)
    }

    pub fn record(&mut self, level: LogLevel, message: impl fmt::Display) -> crate::Result<()> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        writeln!(self.sink, "{} - {} - {}", timestamp, level, message)?;
        self.sink.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
