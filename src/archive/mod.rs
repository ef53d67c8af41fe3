//! Archival of rolled-over log files.
//!
//! When a sink crosses a day boundary it snapshots its directory and hands the
//! file list to an [`ArchiveJob`], which runs detached from the writer:
//!
//! 1. Create `<dir>/backup` if needed
//! 2. Write every file into `backup/<yyyy-mm-dd-HH-MM>.tar.gz`, named after
//!    the previous day
//! 3. Delete the sources, only once the archive is complete
//! 4. Prune archives older than the retention window
//!
//! Jobs from different rotations are not coordinated with each other. Two jobs
//! that land in the same minute race for the same name; the loser aborts and
//! leaves its sources on disk. Concurrent retention sweeps over one `backup`
//! directory may both try to remove the same archive, and the loser records a
//! prune error.
//!
//! # Example
//!
//! ```rust,no_run
//! use filelog::archive::ArchiveJob;
//! use time::OffsetDateTime;
//!
//! let job = ArchiveJob::new(
//!     "./logs",
//!     vec!["./logs/app_001.log".into(), "./logs/app_002.log".into()],
//!     OffsetDateTime::now_utc(),
//!     7,
//! );
//! let stats = job.run()?;
//! println!("{}", stats.summary());
//! # Ok::<(), filelog::Error>(())
//! ```

mod job;
mod prune;
mod stats;

pub use job::{archive_name, ArchiveJob, ARCHIVE_EXTENSION, BACKUP_DIR};
pub use prune::prune_backups;
pub use stats::{ArchiveStats, PruneReport};
