//! Statistics for archive jobs.

use std::path::PathBuf;
use std::time::Duration;

/// Outcome of one retention sweep over a `backup` directory.
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    /// Number of archives inspected.
    pub scanned_count: usize,

    /// Archives removed because they outlived the retention window.
    pub pruned: Vec<PathBuf>,

    /// Errors encountered while evaluating or removing individual archives.
    pub errors: Vec<String>,
}

impl PruneReport {
    pub fn record_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Statistics from a single archive job.
#[derive(Debug, Clone, Default)]
pub struct ArchiveStats {
    /// Destination archive.
    pub archive: PathBuf,

    /// Number of source paths written into the archive.
    pub archived_count: usize,

    /// Uncompressed bytes written into the archive.
    pub archived_bytes: u64,

    /// Sources deleted after the archive completed.
    pub removed_count: usize,

    /// Sources left on disk because they changed after being archived or
    /// could not be removed.
    pub retained_count: usize,

    /// Retention sweep that ran after archiving.
    pub prune: PruneReport,

    /// Number of errors encountered.
    pub error_count: usize,

    /// Errors encountered during the job.
    pub errors: Vec<String>,

    /// Time taken for the job.
    pub duration: Duration,
}

impl ArchiveStats {
    pub fn new(archive: PathBuf) -> Self {
        Self {
            archive,
            ..Self::default()
        }
    }

    pub fn record_archived(&mut self, bytes: u64) {
        self.archived_count += 1;
        self.archived_bytes += bytes;
    }

    pub fn record_error(&mut self, error: String) {
        self.error_count += 1;
        self.errors.push(error);
    }

    pub fn record_prune(&mut self, report: PruneReport) {
        self.error_count += report.errors.len();
        self.errors.extend(report.errors.iter().cloned());
        self.prune = report;
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn summary(&self) -> String {
        format!(
            "Archive: {}, Archived: {} ({} bytes), Removed: {}, Retained: {}, Pruned: {}, Errors: {}, Duration: {:?}",
            self.archive.display(),
            self.archived_count,
            self.archived_bytes,
            self.removed_count,
            self.retained_count,
            self.prune.pruned.len(),
            self.error_count,
            self.duration
        )
    }
}
