//! Rotating file sink for log records.
//!
//! A [`FileSink`] owns one writer thread. Producers on any thread hand it
//! [`LogRecord`]s through a bounded queue; the writer formats each record,
//! appends it to the current file and switches files when a line, size or
//! daily limit is reached. Files rolled over on a day change are bundled into
//! `backup/<date>.tar.gz` by a detached [`archive::ArchiveJob`], which also
//! prunes archives past the retention window.
//!
//! Write failures are not returned to producers. They go to the `log` facade
//! and are counted in [`SinkStats`].

pub mod archive;
pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod policy;
pub mod record;
pub mod rotation;
mod state;
mod writer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SinkConfig;
pub use error::{Error, Result};
pub use format::{format_record, Formatter, PatternFormatter};
pub use policy::{Counters, RotationPolicy, RotationReason};
pub use record::{Level, LogRecord};
pub use state::SinkStats;
pub use writer::{FileSink, FileSinkBuilder, SinkHandle};
