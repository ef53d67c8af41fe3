use crate::policy::RotationPolicy;
use crate::{Error, Result};

pub const DEFAULT_FORMAT: &str = "[%D %T] [%L] (%S) %M";
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;
pub const DEFAULT_MAX_BACKUP_DAYS: u32 = 999;

const XML_FORMAT: &str = "\t<record level=\"%L\">
\t\t<timestamp>%D %T</timestamp>
\t\t<source>%S</source>
\t\t<message>%M</message>
\t</record>";
const XML_HEADER: &str = "<log created=\"%D %T\">";
const XML_TRAILER: &str = "</log>";

/// Sink configuration.
///
/// Thresholds of `0` disable the corresponding rotation trigger.
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Template rendered for every record.
    pub format: String,
    /// Template written at the top of every newly opened file.
    pub header: String,
    /// Template written before a file is closed.
    pub trailer: String,
    /// Rotate once the current file holds this many records.
    pub max_lines: u64,
    /// Rotate once the current file holds this many record bytes.
    pub max_size: u64,
    /// Rotate when the calendar day changes, archiving the directory.
    pub daily: bool,
    /// Give every opened file its own `_NNN` suffix instead of reusing the
    /// base name.
    pub keep_old_files: bool,
    /// Archives in `backup/` older than this many days are pruned.
    pub max_backup_days: u32,
    /// Records that may wait in the queue before `submit` blocks.
    pub queue_capacity: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_FORMAT.to_string(),
            header: String::new(),
            trailer: String::new(),
            max_lines: 0,
            max_size: 0,
            daily: false,
            keep_old_files: false,
            max_backup_days: DEFAULT_MAX_BACKUP_DAYS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl SinkConfig {
    /// Records rendered as `<record>` elements inside a `<log>` document.
    pub fn xml() -> Self {
        Self {
            format: XML_FORMAT.to_string(),
            header: XML_HEADER.to_string(),
            trailer: XML_TRAILER.to_string(),
            ..Self::default()
        }
    }

    pub fn policy(&self) -> RotationPolicy {
        RotationPolicy {
            max_lines: self.max_lines,
            max_size: self.max_size,
            daily: self.daily,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(Error::Config("queue_capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}
