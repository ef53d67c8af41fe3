use std::fmt;

use time::OffsetDateTime;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Finest,
    Fine,
    Debug,
    Trace,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    /// Four-letter tag written by the `%L` placeholder.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Finest => "FNST",
            Level::Fine => "FINE",
            Level::Debug => "DEBG",
            Level::Trace => "TRAC",
            Level::Info => "INFO",
            Level::Warning => "WARN",
            Level::Error => "EROR",
            Level::Critical => "CRIT",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warning,
            log::Level::Info => Level::Info,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}

/// A single log entry handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub created: OffsetDateTime,
    pub level: Level,
    pub source: String,
    pub message: String,
}

impl LogRecord {
    /// Builds a record stamped with the current UTC time.
    ///
    /// Headers, trailers and day boundaries follow the sink's clock, which
    /// may use a local offset. `FileSink::log` stamps records with that clock;
    /// records built here for `submit` can be aligned with [`with_created`].
    ///
    /// [`with_created`]: LogRecord::with_created
    pub fn new(level: Level, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            created: OffsetDateTime::now_utc(),
            level,
            source: source.into(),
            message: message.into(),
        }
    }

    pub fn with_created(mut self, created: OffsetDateTime) -> Self {
        self.created = created;
        self
    }

    /// An empty record carrying only a timestamp, used to render headers and
    /// trailers.
    pub(crate) fn stamp(created: OffsetDateTime) -> Self {
        Self {
            created,
            level: Level::Info,
            source: String::new(),
            message: String::new(),
        }
    }
}
