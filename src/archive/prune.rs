use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::{debug, warn};

use crate::archive::PruneReport;
use crate::{Error, Result};

const SECS_PER_DAY: u64 = 24 * 3600;

/// Delete every file in `backup_dir` whose modification time is more than
/// `max_backup_days` days before `now`.
///
/// Each archive is judged by its own mtime. A failure on one entry is recorded
/// in the report and the sweep moves on; only failing to list the directory
/// aborts.
pub fn prune_backups(backup_dir: &Path, max_backup_days: u32, now: SystemTime) -> Result<PruneReport> {
    let window = Duration::from_secs(u64::from(max_backup_days) * SECS_PER_DAY);
    let mut report = PruneReport::default();
    let mut expired = Vec::new();

    let entries = fs::read_dir(backup_dir).map_err(|source| Error::Archive {
        path: backup_dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                report.record_error(format!("{}: {err}", backup_dir.display()));
                continue;
            }
        };
        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                report.record_error(format!("{}: {err}", path.display()));
                continue;
            }
        };
        if metadata.is_dir() {
            continue;
        }
        report.scanned_count += 1;

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(err) => {
                report.record_error(format!("{}: {err}", path.display()));
                continue;
            }
        };
        if modified
            .checked_add(window)
            .map_or(false, |expires_at| expires_at < now)
        {
            expired.push(path);
        }
    }

    remove_expired(expired, &mut report);
    Ok(report)
}

/// Delete each path, recording failures and carrying on with the rest.
fn remove_expired(paths: Vec<PathBuf>, report: &mut PruneReport) {
    for path in paths {
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("pruned expired archive {}", path.display());
                report.pruned.push(path);
            }
            Err(source) => {
                let err = Error::Prune { path, source };
                warn!("{err}");
                report.record_error(err.to_string());
            }
        }
    }
    report.pruned.sort();
}
