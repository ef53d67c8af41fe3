//! Bundling rolled-over log files into a dated `.tar.gz`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Instant, SystemTime};

use flate2::write::GzEncoder;
use flate2::Compression;
use log::{error, info, warn};
use time::{Duration, OffsetDateTime};

use crate::archive::{prune_backups, ArchiveStats};
use crate::{Error, Result};

pub const BACKUP_DIR: &str = "backup";
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// `yyyy-mm-dd-HH-MM.tar.gz` for the minute one day before `now`.
pub fn archive_name(now: OffsetDateTime) -> String {
    let yesterday = now - Duration::days(1);
    format!(
        "{:04}-{:02}-{:02}-{:02}-{:02}.{ARCHIVE_EXTENSION}",
        yesterday.year(),
        yesterday.month() as u8,
        yesterday.day(),
        yesterday.hour(),
        yesterday.minute()
    )
}

/// A one-shot archive of a fixed set of files.
///
/// The file list is a snapshot taken when the job is created; it is never
/// re-scanned. Sources are deleted only after the whole archive has been
/// written and finalised.
#[derive(Debug, Clone)]
pub struct ArchiveJob {
    dir: PathBuf,
    files: Vec<PathBuf>,
    now: OffsetDateTime,
    max_backup_days: u32,
}

struct ArchivedSource {
    path: PathBuf,
    bytes: u64,
    is_dir: bool,
}

impl ArchiveJob {
    /// # Arguments
    ///
    /// * `dir` - Directory owning the files; archives go to `dir/backup`
    /// * `files` - Paths to bundle
    /// * `now` - Time of the rotation that produced this job
    /// * `max_backup_days` - Retention window applied after archiving
    pub fn new(
        dir: impl Into<PathBuf>,
        files: Vec<PathBuf>,
        now: OffsetDateTime,
        max_backup_days: u32,
    ) -> Self {
        Self {
            dir: dir.into(),
            files,
            now,
            max_backup_days,
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.dir.join(BACKUP_DIR)
    }

    pub fn destination(&self) -> PathBuf {
        self.backup_dir().join(archive_name(self.now))
    }

    /// Run the job on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The `backup` directory cannot be created
    /// - The destination archive already exists
    /// - Any source cannot be read or the archive cannot be written
    ///
    /// In each case no source file is deleted. A failure while streaming
    /// leaves the partial archive in place.
    pub fn run(self) -> Result<ArchiveStats> {
        let start = Instant::now();
        let backup_dir = self.backup_dir();
        let destination = self.destination();
        let mut stats = ArchiveStats::new(destination.clone());

        fs::create_dir_all(&backup_dir).map_err(|source| Error::CreateDirectory {
            path: backup_dir.clone(),
            source,
        })?;

        let output = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&destination)
            .map_err(|source| {
                if source.kind() == io::ErrorKind::AlreadyExists {
                    Error::ArchiveExists(destination.clone())
                } else {
                    Error::Archive {
                        path: destination.clone(),
                        source,
                    }
                }
            })?;

        let archived = write_archive(output, &self.files).map_err(|source| Error::Archive {
            path: destination.clone(),
            source,
        })?;

        for source in archived {
            stats.record_archived(source.bytes);
            remove_source(&source, &mut stats);
        }

        match prune_backups(&backup_dir, self.max_backup_days, SystemTime::from(self.now)) {
            Ok(prune) => stats.record_prune(prune),
            Err(err) => stats.record_error(err.to_string()),
        }

        stats.duration = start.elapsed();
        Ok(stats)
    }

    /// Run the job on a detached thread, reporting the outcome through `log`.
    pub fn spawn(self) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("log-archiver".to_string())
            .spawn(move || {
                let destination = self.destination();
                match self.run() {
                    Ok(stats) if stats.has_errors() => warn!("{}", stats.summary()),
                    Ok(stats) => info!("{}", stats.summary()),
                    Err(err) => error!("archive job for {} aborted: {err}", destination.display()),
                }
            })
            .map_err(Error::Io)
    }
}

fn write_archive<W: Write>(output: W, sources: &[PathBuf]) -> io::Result<Vec<ArchivedSource>> {
    let encoder = GzEncoder::new(output, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut archived = Vec::with_capacity(sources.len());

    for source in sources {
        let name = source.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no file name in {}", source.display()),
            )
        })?;
        let is_dir = fs::symlink_metadata(source)?.is_dir();
        let bytes = append_tree(&mut builder, source, Path::new(name))?;
        archived.push(ArchivedSource {
            path: source.clone(),
            bytes,
            is_dir,
        });
    }

    let encoder = builder.into_inner()?;
    let mut output = encoder.finish()?;
    output.flush()?;
    Ok(archived)
}

/// Append `root` under `name`, walking directories with an explicit work list.
/// Returns the number of file bytes appended.
fn append_tree<W: Write>(
    builder: &mut tar::Builder<W>,
    root: &Path,
    name: &Path,
) -> io::Result<u64> {
    let mut pending = vec![(root.to_path_buf(), name.to_path_buf())];
    let mut total = 0u64;

    while let Some((path, entry_name)) = pending.pop() {
        if fs::symlink_metadata(&path)?.is_dir() {
            for entry in fs::read_dir(&path)? {
                let entry = entry?;
                pending.push((entry.path(), entry_name.join(entry.file_name())));
            }
            continue;
        }

        let metadata = fs::metadata(&path)?;
        if metadata.is_dir() {
            warn!("skipping symlinked directory {}", path.display());
            continue;
        }
        let len = metadata.len();
        let mut header = tar::Header::new_gnu();
        header.set_metadata(&metadata);
        header.set_size(len);
        let file = File::open(&path)?;
        builder.append_data(&mut header, &entry_name, file.take(len))?;
        total += len;
    }

    Ok(total)
}

fn remove_source(source: &ArchivedSource, stats: &mut ArchiveStats) {
    if source.is_dir {
        if let Err(err) = fs::remove_dir(&source.path) {
            stats.retained_count += 1;
            stats.record_error(format!("{}: {err}", source.path.display()));
        } else {
            stats.removed_count += 1;
        }
        return;
    }

    // A source that grew after it was archived was reopened for writing.
    match fs::metadata(&source.path) {
        Ok(metadata) if metadata.len() != source.bytes => {
            warn!(
                "{} changed after archiving ({} -> {} bytes), keeping it",
                source.path.display(),
                source.bytes,
                metadata.len()
            );
            stats.retained_count += 1;
            return;
        }
        Ok(_) => {}
        Err(err) => {
            stats.retained_count += 1;
            stats.record_error(format!("{}: {err}", source.path.display()));
            return;
        }
    }

    match fs::remove_file(&source.path) {
        Ok(()) => stats.removed_count += 1,
        Err(err) => {
            stats.retained_count += 1;
            stats.record_error(format!("{}: {err}", source.path.display()));
        }
    }
}
