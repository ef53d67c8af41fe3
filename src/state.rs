use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::error;
use time::{Date, OffsetDateTime};

use crate::clock::Clock;
use crate::config::SinkConfig;
use crate::format::Formatter;
use crate::policy::{Counters, RotationPolicy};
use crate::record::LogRecord;
use crate::Error;

/// Point-in-time copy of a sink's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Records appended successfully.
    pub records_written: u64,
    /// Log files opened, including the first one.
    pub files_opened: u64,
    /// Failures reported on the diagnostic channel.
    pub errors: u64,
}

#[derive(Debug, Default)]
pub(crate) struct SinkMetrics {
    records_written: AtomicU64,
    files_opened: AtomicU64,
    errors: AtomicU64,
}

impl SinkMetrics {
    pub(crate) fn snapshot(&self) -> SinkStats {
        SinkStats {
            records_written: self.records_written.load(Ordering::Relaxed),
            files_opened: self.files_opened.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_written(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn file_opened(&self) {
        self.files_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Everything the writer thread owns: the open file, its counters and the
/// configuration it was built with. Nothing else touches it after the sink
/// starts.
pub(crate) struct WriterState {
    pub(crate) base: PathBuf,
    pub(crate) config: SinkConfig,
    pub(crate) policy: RotationPolicy,
    pub(crate) counters: Counters,
    pub(crate) opened_day: Option<Date>,
    pub(crate) log_index: u32,
    pub(crate) file: Option<File>,
    pub(crate) path: Option<PathBuf>,
    pub(crate) formatter: Box<dyn Formatter>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) metrics: Arc<SinkMetrics>,
}

impl WriterState {
    pub(crate) fn new(
        base: PathBuf,
        config: SinkConfig,
        formatter: Box<dyn Formatter>,
        clock: Arc<dyn Clock>,
        metrics: Arc<SinkMetrics>,
    ) -> Self {
        let policy = config.policy();
        Self {
            base,
            config,
            policy,
            counters: Counters::default(),
            opened_day: None,
            log_index: 0,
            file: None,
            path: None,
            formatter,
            clock,
            metrics,
        }
    }

    pub(crate) fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Render a header or trailer template.
    pub(crate) fn render(&self, template: &str, now: OffsetDateTime) -> String {
        if template.is_empty() {
            return String::new();
        }
        self.formatter.format(template, &LogRecord::stamp(now))
    }

    pub(crate) fn report(&self, err: &Error) {
        self.metrics.error();
        error!("file sink {}: {err}", self.base.display());
    }

    /// Write the trailer to the current file, if any, and close it.
    pub(crate) fn close_current(&mut self, now: OffsetDateTime) {
        let Some(mut file) = self.file.take() else {
            return;
        };
        let path = self.path.clone().unwrap_or_else(|| self.base.clone());
        let trailer = self.render(&self.config.trailer, now);
        if !trailer.is_empty() {
            if let Err(source) = file.write_all(trailer.as_bytes()) {
                self.report(&Error::Write { path: path.clone(), source });
            }
        }
        if let Err(source) = file.sync_all() {
            self.report(&Error::Write { path, source });
        }
    }
}
