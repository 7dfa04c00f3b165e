//! Per-connection access log.
//!
//! The connection pipeline builds one [`LogRecord`] per decision point and
//! hands it to a [`LogSink`]. Sinks are shared by every connection task and
//! must keep each record on a single, uninterleaved line.

use chrono::{DateTime, Local};
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use tracing::warn;
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};

/// Outcome tag of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Blocked,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Blocked => "BLOCKED",
            Status::Error => "ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One access log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub client_addr: String,
    pub host: String,
    pub method: String,
    pub status: Status,
    pub detail: String,
}

impl LogRecord {
    /// Creates a record stamped with the current local time.
    pub fn new(
        client_addr: impl Into<String>,
        host: impl Into<String>,
        method: impl Into<String>,
        status: Status,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            client_addr: client_addr.into(),
            host: host.into(),
            method: method.into(),
            status,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] Client: {} | Host: {} | Method: {} | Status: {} | Details: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.client_addr,
            self.host,
            self.method,
            self.status,
            self.detail
        )
    }
}

/// Destination for access log records.
pub trait LogSink: Send + Sync {
    /// Persists one record. Implementations serialize concurrent calls.
    fn record(&self, record: &LogRecord);
}

/// Appends records to a file through a dedicated writer thread.
///
/// Each record is queued as one complete line, so concurrent connections
/// never interleave partial records. Records are never dropped: when the
/// writer thread falls behind and its queue is full, [`LogSink::record`]
/// blocks the calling worker thread until space frees up, slowing new
/// connections down rather than losing their records.
#[derive(Clone)]
pub struct FileLogSink {
    writer: NonBlocking,
}

impl FileLogSink {
    /// Opens `path` for appending, creating it if needed.
    ///
    /// The returned guard flushes pending records when dropped and must be
    /// held for as long as the sink is in use.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<(Self, WorkerGuard)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        let (writer, guard) = NonBlockingBuilder::default()
            .lossy(false)
            .thread_name("access-log")
            .finish(file);
        Ok((Self { writer }, guard))
    }
}

impl LogSink for FileLogSink {
    fn record(&self, record: &LogRecord) {
        let line = format!("{}\n", record);
        let mut writer = self.writer.clone();
        if let Err(e) = writer.write_all(line.as_bytes()) {
            warn!(error = %e, "Failed to write access log record");
        }
    }
}
