/// Structured logging for the car park availability service
///
/// Provides context-rich logging with car park identifiers,
/// timestamps, and severity levels. Supports both console output
/// and file-based logging for long-running operation.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Log Sources
// ---------------------------------------------------------------------------

/// The subsystem a log line originates from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    Catalog,
    Availability,
    Database,
    Ingest,
    Query,
    System,
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSource::Catalog => write!(f, "CATALOG"),
            LogSource::Availability => write!(f, "AVAIL"),
            LogSource::Database => write!(f, "DB"),
            LogSource::Ingest => write!(f, "INGEST"),
            LogSource::Query => write!(f, "QUERY"),
            LogSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, source: &LogSource, key: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = format_entry(level, source, key, message);
        let key_part = key.map(|k| format!(" [{}]", k)).unwrap_or_default();

        // Console output goes to stderr; stdout carries command results.
        if self.console_timestamps {
            eprintln!("{}", log_entry);
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", source, key_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", source, key_part, message),
                LogLevel::Info => eprintln!("   {}", message),
                LogLevel::Debug => eprintln!("   [DEBUG] {}", message),
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

/// Renders one log line in the file/timestamped format:
/// `2024-05-01 13:00:00 UTC INFO CATALOG [ACB]: message`.
fn format_entry(level: LogLevel, source: &LogSource, key: Option<&str>, message: &str) -> String {
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let key_part = key.map(|k| format!(" [{}]", k)).unwrap_or_default();
    format!("{} {} {}{}: {}", timestamp, level, source, key_part, message)
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn dispatch(level: LogLevel, source: LogSource, key: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, &source, key, message);
        }
    }
}

/// Log a general informational message
pub fn info(source: LogSource, key: Option<&str>, message: &str) {
    dispatch(LogLevel::Info, source, key, message);
}

/// Log a warning message
pub fn warn(source: LogSource, key: Option<&str>, message: &str) {
    dispatch(LogLevel::Warning, source, key, message);
}

/// Log an error message
pub fn error(source: LogSource, key: Option<&str>, message: &str) {
    dispatch(LogLevel::Error, source, key, message);
}

/// Log a debug message
pub fn debug(source: LogSource, key: Option<&str>, message: &str) {
    dispatch(LogLevel::Debug, source, key, message);
}

// ---------------------------------------------------------------------------
// Summary Logging
// ---------------------------------------------------------------------------

/// Log the outcome of a catalog load: how many rows became locations and
/// how many were dropped for failing validation.
pub fn log_load_summary(loaded: usize, dropped: usize) {
    let message = format!(
        "Catalog loaded: {} car parks, {} rows dropped",
        loaded,
        dropped
    );

    if loaded == 0 {
        warn(LogSource::Catalog, None, &message);
    } else {
        info(LogSource::Catalog, None, &message);
    }
}

/// Log an availability lookup that failed and was answered with an empty
/// mapping instead.
pub fn log_lookup_failure(operation: &str, err: &dyn std::error::Error) {
    let message = format!(
        "{} failed, treating all car parks as having no known availability: {}",
        operation,
        err
    );
    error(LogSource::Availability, None, &message);
}

/// Log a summary of a single ingest pass
pub fn log_ingest_summary(fetched: usize, stored: u64) {
    let message = format!(
        "Ingest complete: {} records fetched, {} new rows stored",
        fetched,
        stored
    );

    if fetched == 0 {
        warn(LogSource::Ingest, None, &message);
    } else {
        info(LogSource::Ingest, None, &message);
    }
}
