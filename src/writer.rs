use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, Receiver, Sender};
use log::{debug, error};

use crate::clock::{Clock, SystemClock};
use crate::config::SinkConfig;
use crate::format::{Formatter, PatternFormatter};
use crate::record::{Level, LogRecord};
use crate::rotation::{self, sink_dir};
use crate::state::{SinkMetrics, SinkStats, WriterState};
use crate::{Error, Result};

const ROTATION_QUEUE_DEPTH: usize = 1;

enum Command {
    Record(LogRecord),
    Close,
}

struct Shared {
    base: PathBuf,
    records: Sender<Command>,
    rotations: Sender<()>,
    // true once close() has queued its marker
    closed: RwLock<bool>,
    metrics: Arc<SinkMetrics>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("base", &self.base)
            .field("closed", &self.closed)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn log(&self, level: Level, source: &str, message: String) -> Result<()> {
        let record = LogRecord::new(level, source, message).with_created(self.clock.now());
        self.submit(record)
    }

    fn submit(&self, record: LogRecord) -> Result<()> {
        let closed = self.closed.read().unwrap_or_else(PoisonError::into_inner);
        if *closed {
            return Err(Error::Closed);
        }
        self.records
            .send(Command::Record(record))
            .map_err(|_| Error::Closed)
    }

    fn request_rotation(&self) -> Result<()> {
        let closed = self.closed.read().unwrap_or_else(PoisonError::into_inner);
        if *closed {
            return Err(Error::Closed);
        }
        self.rotations.send(()).map_err(|_| Error::Closed)
    }

    fn close(&self) -> Result<()> {
        let mut closed = self.closed.write().unwrap_or_else(PoisonError::into_inner);
        if *closed {
            return Err(Error::Closed);
        }
        *closed = true;
        self.records.send(Command::Close).map_err(|_| Error::Closed)
    }

    fn is_closed(&self) -> bool {
        *self.closed.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A rotating file sink with a dedicated writer thread.
///
/// Records submitted from any number of threads are appended in the order
/// they are dequeued. Before each write the rotation policy is checked, and a
/// day change with daily rotation enabled hands the directory to a detached
/// archive job.
///
/// Failures inside the writer are never returned to producers; they are
/// logged through `log` and counted in [`SinkStats::errors`].
///
/// # Example
///
/// ```no_run
/// use filelog::{FileSink, Level};
///
/// let sink = FileSink::builder("./logs/app")
///     .rotate_lines(10_000)
///     .rotate_daily(true)
///     .keep_old_files(true)
///     .build()?;
///
/// sink.log(Level::Info, "main", "started")?;
/// sink.close()?;
/// # Ok::<(), filelog::Error>(())
/// ```
#[derive(Debug)]
pub struct FileSink {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

/// A cloneable producer handle for a [`FileSink`].
///
/// Handles can submit records and request rotations but cannot close the
/// sink. Once the owning sink is closed every call fails with
/// [`Error::Closed`].
#[derive(Debug, Clone)]
pub struct SinkHandle {
    shared: Arc<Shared>,
}

impl FileSink {
    pub fn builder(base: impl Into<PathBuf>) -> FileSinkBuilder {
        FileSinkBuilder::new(base)
    }

    pub fn open(base: impl Into<PathBuf>, config: SinkConfig) -> Result<Self> {
        FileSinkBuilder::new(base).config(config).build()
    }

    pub fn handle(&self) -> SinkHandle {
        SinkHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Queue a record for writing.
    ///
    /// Blocks while the queue is full; records are never dropped for lack of
    /// room.
    pub fn submit(&self, record: LogRecord) -> Result<()> {
        self.shared.submit(record)
    }

    /// Queue a record stamped by the sink's clock, so record times share the
    /// offset used for headers and day boundaries.
    pub fn log(&self, level: Level, source: &str, message: impl Into<String>) -> Result<()> {
        self.shared.log(level, source, message.into())
    }

    /// Ask the writer to switch to a new file.
    ///
    /// The request is serviced eventually. It is not ordered against records
    /// queued around the same time: when both are pending the writer picks
    /// either one.
    pub fn request_rotation(&self) -> Result<()> {
        self.shared.request_rotation()
    }

    pub fn stats(&self) -> SinkStats {
        self.shared.metrics.snapshot()
    }

    pub fn base_path(&self) -> &Path {
        &self.shared.base
    }

    /// Stop accepting records, write everything already queued, write the
    /// trailer and release the file.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Err(Error::Closed);
        };
        let closed = self.shared.close();
        let joined = worker.join().map_err(|_| Error::WriterPanicked);
        closed.and(joined)
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if self.worker.is_none() {
            return;
        }
        if let Err(err) = self.shutdown() {
            error!("file sink {}: close on drop failed: {err}", self.shared.base.display());
        }
    }
}

impl SinkHandle {
    /// See [`FileSink::submit`].
    pub fn submit(&self, record: LogRecord) -> Result<()> {
        self.shared.submit(record)
    }

    pub fn log(&self, level: Level, source: &str, message: impl Into<String>) -> Result<()> {
        self.shared.log(level, source, message.into())
    }

    /// See [`FileSink::request_rotation`].
    pub fn request_rotation(&self) -> Result<()> {
        self.shared.request_rotation()
    }

    pub fn stats(&self) -> SinkStats {
        self.shared.metrics.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

/// Configures and opens a [`FileSink`].
///
/// Building consumes the builder, so a running sink cannot be reconfigured.
pub struct FileSinkBuilder {
    base: PathBuf,
    config: SinkConfig,
    formatter: Box<dyn Formatter>,
    clock: Arc<dyn Clock>,
}

impl FileSinkBuilder {
    /// `base` is the log path without extension; files are named
    /// `<base>.log` or `<base>_NNN.log`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            config: SinkConfig::default(),
            formatter: Box::new(PatternFormatter),
            clock: Arc::new(SystemClock::new()),
        }
    }

    pub fn config(mut self, config: SinkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.config.format = format.into();
        self
    }

    pub fn head_foot(mut self, header: impl Into<String>, trailer: impl Into<String>) -> Self {
        self.config.header = header.into();
        self.config.trailer = trailer.into();
        self
    }

    pub fn rotate_lines(mut self, max_lines: u64) -> Self {
        self.config.max_lines = max_lines;
        self
    }

    pub fn rotate_size(mut self, max_size: u64) -> Self {
        self.config.max_size = max_size;
        self
    }

    pub fn rotate_daily(mut self, daily: bool) -> Self {
        self.config.daily = daily;
        self
    }

    /// Retention window for archives, in days.
    pub fn max_backup_days(mut self, days: u32) -> Self {
        self.config.max_backup_days = days;
        self
    }

    pub fn keep_old_files(mut self, keep: bool) -> Self {
        self.config.keep_old_files = keep;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn formatter(mut self, formatter: impl Formatter) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Open the first log file and start the writer thread.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid, the directory cannot be
    /// created, or the first file cannot be opened.
    pub fn build(self) -> Result<FileSink> {
        self.config.validate()?;

        let dir = sink_dir(&self.base);
        fs::create_dir_all(&dir).map_err(|source| Error::CreateDirectory { path: dir, source })?;

        let capacity = self.config.queue_capacity;
        let metrics = Arc::new(SinkMetrics::default());
        let mut state = WriterState::new(
            self.base.clone(),
            self.config,
            self.formatter,
            Arc::clone(&self.clock),
            Arc::clone(&metrics),
        );
        let now = state.now();
        rotation::rotate(&mut state, now)?;

        let (record_tx, record_rx) = bounded(capacity);
        let (rotate_tx, rotate_rx) = bounded(ROTATION_QUEUE_DEPTH);
        let worker = thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || run_writer(state, record_rx, rotate_rx))
            .map_err(Error::Io)?;

        Ok(FileSink {
            shared: Arc::new(Shared {
                base: self.base,
                records: record_tx,
                rotations: rotate_tx,
                closed: RwLock::new(false),
                metrics,
                clock: self.clock,
            }),
            worker: Some(worker),
        })
    }
}

// `select!` picks uniformly among ready operations, so neither queue has
// priority over the other.
fn run_writer(mut state: WriterState, records: Receiver<Command>, rotations: Receiver<()>) {
    loop {
        select! {
            recv(rotations) -> request => match request {
                Ok(()) => state.rotate_on_request(),
                Err(_) => break,
            },
            recv(records) -> command => match command {
                Ok(Command::Record(record)) => state.write_record(&record),
                Ok(Command::Close) | Err(_) => break,
            },
        }
    }

    for command in records.try_iter() {
        if let Command::Record(record) = command {
            state.write_record(&record);
        }
    }

    let now = state.now();
    state.close_current(now);
    debug!("file sink {} closed", state.base.display());
}

impl WriterState {
    fn rotate_on_request(&mut self) {
        let now = self.now();
        if let Err(err) = rotation::rotate(self, now) {
            self.report(&err);
        }
    }

    fn write_record(&mut self, record: &LogRecord) {
        let now = self.now();
        let reason = if self.file.is_none() {
            Some("no open file")
        } else {
            self.policy
                .evaluate(self.counters, self.opened_day, now.date())
                .map(|reason| reason.as_str())
        };
        if let Some(reason) = reason {
            debug!("rotating {} ({reason})", self.base.display());
            if let Err(err) = rotation::rotate(self, now) {
                self.report(&err);
                return;
            }
        }

        let line = self.formatter.format(&self.config.format, record);
        let Some(file) = self.file.as_mut() else {
            self.report(&Error::NoActiveFile);
            return;
        };
        match file.write_all(line.as_bytes()) {
            Ok(()) => {
                self.counters.lines += 1;
                self.counters.bytes += line.len() as u64;
                self.metrics.record_written();
            }
            Err(source) => {
                let path = self.path.clone().unwrap_or_else(|| self.base.clone());
                self.report(&Error::Write { path, source });
            }
        }
    }
}
