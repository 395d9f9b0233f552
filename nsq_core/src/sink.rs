use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;

/// File name for successful requests
pub const REQUEST_LOG: &str = "request.log";

/// File name for failed attempts that will be retried
pub const RETRY_LOG: &str = "retry.log";

/// File name for terminal failures
pub const ERROR_LOG: &str = "error.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Error,
}

/// One structured log entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub component: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub message: String,
    pub context: Value,
    pub timestamp_ms: u64,
}

/// Append-only destination for request/retry/error records.
///
/// Implementations must not fail the caller: write errors are reported through
/// `tracing` and otherwise dropped.
pub trait LogSink: Send + Sync {
    fn write(&self, record: LogRecord);

    fn info(&self, component: &str, path: &Path, message: &str, context: &Value) {
        self.write(LogRecord::new(LogLevel::Info, component, path, message, context));
    }

    fn error(&self, component: &str, path: &Path, message: &str, context: &Value) {
        self.write(LogRecord::new(LogLevel::Error, component, path, message, context));
    }
}

impl LogRecord {
    pub fn new(level: LogLevel, component: &str, path: &Path, message: &str, context: &Value) -> Self {
        let timestamp_ms = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or_default();

        Self {
            level,
            component: component.to_string(),
            path: path.to_path_buf(),
            message: message.to_string(),
            context: context.clone(),
            timestamp_ms,
        }
    }
}

fn emit_event(record: &LogRecord) {
    let path = record.path.display();
    match record.level {
        LogLevel::Info => tracing::info!(component = %record.component, path = %path, context = %record.context, "{}", record.message),
        LogLevel::Error => tracing::error!(component = %record.component, path = %path, context = %record.context, "{}", record.message),
    }
}

/// Emits every record as a `tracing` event and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn write(&self, record: LogRecord) {
        emit_event(&record);
    }
}

/// Appends one JSON line per record to the file named by the record's path,
/// and mirrors it as a `tracing` event.
#[derive(Default)]
pub struct FileLogSink {
    writers: Mutex<HashMap<PathBuf, RollingFileAppender>>,
}

impl FileLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&self, record: &LogRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut writers = self.writers.lock();
        if !writers.contains_key(&record.path) {
            let appender = open_appender(&record.path)?;
            writers.insert(record.path.clone(), appender);
        }

        match writers.get_mut(&record.path) {
            Some(writer) => {
                writer.write_all(&line)?;
                writer.flush()
            }
            None => Ok(()),
        }
    }
}

fn open_appender(path: &Path) -> std::io::Result<RollingFileAppender> {
    let directory = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("invalid log path: {}", path.display())))?;

    std::fs::create_dir_all(directory)?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .map_err(|err| std::io::Error::other(err.to_string()))
}

impl LogSink for FileLogSink {
    fn write(&self, record: LogRecord) {
        emit_event(&record);

        if let Err(err) = self.append(&record) {
            tracing::warn!("Failed to append log record to {}: {err}", record.path.display());
        }
    }
}

/// Keeps records in memory. Handy for tests and for embedding callers that ship logs elsewhere.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Records whose path ends with `file_name`
    pub fn records_in(&self, file_name: &str) -> Vec<LogRecord> {
        self.records.lock().iter().filter(|record| record.path.ends_with(file_name)).cloned().collect()
    }
}

impl LogSink for MemoryLogSink {
    fn write(&self, record: LogRecord) {
        self.records.lock().push(record);
    }
}
