//! Engine types
//!
//! Message types, read configuration and statistics for the traversal engine.

use crate::remote::DEFAULT_PAGE_SIZE;
use arrow::record_batch::RecordBatch;
use serde::Serialize;

/// A message emitted during a read
#[derive(Debug, Clone)]
pub enum Message {
    /// A batch of records
    Record {
        /// Stream name
        stream: String,
        /// The record batch
        batch: RecordBatch,
    },
    /// Log message
    Log {
        /// Log level
        level: LogLevel,
        /// Log message
        message: String,
    },
}

/// Log level for engine messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// General information
    Info,
    /// Warning
    Warn,
    /// Error (non-fatal)
    Error,
}

impl Message {
    /// Create a record message
    pub fn record(stream: impl Into<String>, batch: RecordBatch) -> Self {
        Self::Record {
            stream: stream.into(),
            batch,
        }
    }

    /// Create a log message
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
        }
    }

    /// Create an info log
    pub fn info(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Info, message)
    }

    /// Create a debug log
    pub fn debug(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Debug, message)
    }

    /// Create a warning log
    pub fn warn(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Warn, message)
    }

    /// Create an error log
    pub fn error(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Error, message)
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a log message
    pub fn is_log(&self) -> bool {
        matches!(self, Self::Log { .. })
    }
}

/// Configuration for a read session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadConfig {
    /// Page size requested from the store
    pub page_size: u32,
    /// Records per emitted batch
    pub batch_size: usize,
    /// Maximum records to read (0 = unlimited)
    pub max_records: usize,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: 1000,
            max_records: 0,
        }
    }
}

impl ReadConfig {
    /// Create a new read config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page size
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Set batch size
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set max records
    #[must_use]
    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = max;
        self
    }
}

/// Counters of one traversal session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    /// Items returned by the store, before filtering
    pub total_seen: u64,
    /// Positions handed out through `current()`
    pub yielded_count: u64,
}

/// Statistics from a batched read
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReadStats {
    /// Records emitted
    pub records_read: usize,
    /// Batches emitted
    pub batches: usize,
    /// Pages fetched
    pub pages_fetched: usize,
    /// Items returned by the store, before filtering
    pub total_seen: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ReadStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records
    pub fn add_records(&mut self, count: usize) {
        self.records_read += count;
    }

    /// Add a batch
    pub fn add_batch(&mut self) {
        self.batches += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
