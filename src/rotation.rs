//! Switching a sink from one log file to the next.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;
use time::OffsetDateTime;

use crate::archive::ArchiveJob;
use crate::policy::Counters;
use crate::state::WriterState;
use crate::{Error, Result};

pub const LOG_EXTENSION: &str = "log";

#[cfg(unix)]
const LOG_FILE_MODE: u32 = 0o664;

/// `<base>.log`, or `<base>_NNN.log` when an index is given.
pub fn log_file_name(base: &Path, index: Option<u32>) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    if let Some(index) = index {
        name.push(format!("_{index:03}"));
    }
    name.push(".");
    name.push(LOG_EXTENSION);
    PathBuf::from(name)
}

/// Directory holding a sink's files; `.` for a bare base name.
pub fn sink_dir(base: &Path) -> PathBuf {
    match base.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Close the current file and open the next one.
///
/// 1. Write the trailer and close the open file, if any
/// 2. On a day change with daily rotation, move `<base>.log` aside when old
///    files are not kept, then snapshot the directory and hand it to a
///    detached [`ArchiveJob`]
/// 3. Pick the next name, bumping the index when old files are kept
/// 4. Open it for append, creating it if needed
/// 5. Write the header and reset the counters
///
/// On an open failure the sink is left without a file; the writer retries on
/// the next record.
pub(crate) fn rotate(state: &mut WriterState, now: OffsetDateTime) -> Result<()> {
    state.close_current(now);

    let today = now.date();
    if state.config.daily {
        if let Some(opened_day) = state.opened_day {
            if opened_day != today {
                dispatch_archive(state, now);
            }
        }
    }
    // the day change is handled even if the open below fails
    state.opened_day = Some(today);

    let index = if state.config.keep_old_files {
        state.log_index += 1;
        Some(state.log_index)
    } else {
        None
    };
    let path = log_file_name(&state.base, index);
    let mut file = open_log_file(&path)?;

    let header = state.render(&state.config.header, now);
    if !header.is_empty() {
        if let Err(source) = file.write_all(header.as_bytes()) {
            state.report(&Error::Write {
                path: path.clone(),
                source,
            });
        }
    }

    debug!("opened log file {}", path.display());
    state.file = Some(file);
    state.path = Some(path);
    state.counters = Counters::default();
    state.metrics.file_opened();
    Ok(())
}

fn open_log_file(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(LOG_FILE_MODE);
    }
    options.open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// `<base>.log.<yyyy-mm-dd-HH-MM>`, with a `.N` suffix if that is taken.
fn rolled_file_name(base: &Path, now: OffsetDateTime) -> PathBuf {
    let mut name = log_file_name(base, None).into_os_string();
    name.push(format!(
        ".{:04}-{:02}-{:02}-{:02}-{:02}",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute()
    ));
    let rolled = PathBuf::from(name);
    let mut candidate = rolled.clone();
    let mut n = 0u32;
    while candidate.exists() {
        n += 1;
        let mut name = rolled.clone().into_os_string();
        name.push(format!(".{n}"));
        candidate = PathBuf::from(name);
    }
    candidate
}

/// Move a closed `<base>.log` out of the way so the archive job owns it and
/// the writer starts a fresh file. Returns the new name, or `None` if there
/// was no base file.
fn roll_base_file(base: &Path, now: OffsetDateTime) -> io::Result<Option<PathBuf>> {
    let current = log_file_name(base, None);
    if !current.exists() {
        return Ok(None);
    }
    let rolled = rolled_file_name(base, now);
    fs::rename(&current, &rolled)?;
    debug!("rolled {} to {}", current.display(), rolled.display());
    Ok(Some(rolled))
}

fn dispatch_archive(state: &WriterState, now: OffsetDateTime) {
    if !state.config.keep_old_files {
        if let Err(source) = roll_base_file(&state.base, now) {
            // archiving the live file would race with the reopen below
            state.report(&Error::Archive {
                path: log_file_name(&state.base, None),
                source,
            });
            return;
        }
    }

    let dir = sink_dir(&state.base);
    let files = match snapshot_files(&dir) {
        Ok(files) => files,
        Err(source) => {
            state.report(&Error::Archive { path: dir, source });
            return;
        }
    };
    if files.is_empty() {
        return;
    }

    debug!("archiving {} files from {}", files.len(), dir.display());
    let job = ArchiveJob::new(dir, files, now, state.config.max_backup_days);
    if let Err(err) = job.spawn() {
        state.report(&err);
    }
}

/// Every non-directory entry of `dir`, sorted.
fn snapshot_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::config::SinkConfig;
    use crate::state::tests::state_at;
    use tempfile::TempDir;
    use time::{Date, Duration, Month, Time};

    #[test]
    fn test_log_file_names() {
        let base = Path::new("/var/log/app");
        assert_eq!(log_file_name(base, None), PathBuf::from("/var/log/app.log"));
        assert_eq!(log_file_name(base, Some(7)), PathBuf::from("/var/log/app_007.log"));
        assert_eq!(log_file_name(base, Some(1234)), PathBuf::from("/var/log/app_1234.log"));
    }

    #[test]
    fn test_sink_dir() {
        assert_eq!(sink_dir(Path::new("logs/app")), PathBuf::from("logs"));
        assert_eq!(sink_dir(Path::new("app")), PathBuf::from("."));
    }

    #[test]
    fn test_rotate_writes_header_and_trailer() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("app");
        let clock = ManualClock::new(OffsetDateTime::now_utc());
        let config = SinkConfig {
            header: "BEGIN".to_string(),
            trailer: "END".to_string(),
            keep_old_files: true,
            ..SinkConfig::default()
        };
        let mut state = state_at(&base, config, &clock);

        rotate(&mut state, clock.now()).unwrap();
        state.counters = Counters { lines: 3, bytes: 30 };
        rotate(&mut state, clock.now()).unwrap();

        assert_eq!(state.log_index, 2);
        assert_eq!(state.counters, Counters::default());
        assert_eq!(state.path, Some(temp_dir.path().join("app_002.log")));
        assert_eq!(fs::read_to_string(temp_dir.path().join("app_001.log")).unwrap(), "BEGIN\nEND\n");
        assert_eq!(fs::read_to_string(temp_dir.path().join("app_002.log")).unwrap(), "BEGIN\n");
        assert_eq!(state.metrics.snapshot().files_opened, 2);
    }

    #[test]
    fn test_rotate_without_index_reuses_base_name() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("app");
        let clock = ManualClock::new(OffsetDateTime::now_utc());
        let mut state = state_at(&base, SinkConfig::default(), &clock);

        rotate(&mut state, clock.now()).unwrap();
        rotate(&mut state, clock.now()).unwrap();

        assert_eq!(state.log_index, 0);
        assert_eq!(state.path, Some(temp_dir.path().join("app.log")));
    }

    #[test]
    fn test_daily_rotation_records_new_day() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("app");
        let clock = ManualClock::new(OffsetDateTime::now_utc());
        let config = SinkConfig {
            daily: true,
            keep_old_files: true,
            ..SinkConfig::default()
        };
        let mut state = state_at(&base, config, &clock);

        rotate(&mut state, clock.now()).unwrap();
        let first_day = state.opened_day;
        state.counters = Counters { lines: 5, bytes: 50 };

        clock.advance(Duration::days(1));
        rotate(&mut state, clock.now()).unwrap();

        assert_ne!(state.opened_day, first_day);
        assert_eq!(state.opened_day, Some(clock.now().date()));
        assert_eq!(state.counters, Counters::default());
    }

    #[test]
    fn test_roll_base_file_picks_free_names() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("app");
        let now = Date::from_calendar_date(2026, Month::March, 2)
            .unwrap()
            .with_time(Time::from_hms(0, 5, 0).unwrap())
            .assume_utc();

        assert_eq!(roll_base_file(&base, now).unwrap(), None);

        fs::write(temp_dir.path().join("app.log"), b"one\n").unwrap();
        let first = roll_base_file(&base, now).unwrap().unwrap();
        fs::write(temp_dir.path().join("app.log"), b"two\n").unwrap();
        let second = roll_base_file(&base, now).unwrap().unwrap();

        assert_eq!(first, temp_dir.path().join("app.log.2026-03-02-00-05"));
        assert_eq!(second, temp_dir.path().join("app.log.2026-03-02-00-05.1"));
        assert!(!temp_dir.path().join("app.log").exists());
        assert_eq!(fs::read_to_string(&first).unwrap(), "one\n");
        assert_eq!(fs::read_to_string(&second).unwrap(), "two\n");
    }

    #[test]
    fn test_day_change_without_numbering_starts_fresh_base_file() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("app");
        let clock = ManualClock::new(OffsetDateTime::now_utc());
        let config = SinkConfig {
            daily: true,
            ..SinkConfig::default()
        };
        let mut state = state_at(&base, config, &clock);

        rotate(&mut state, clock.now()).unwrap();
        state.file.as_mut().unwrap().write_all(b"yesterday\n").unwrap();
        clock.advance(Duration::days(1));
        rotate(&mut state, clock.now()).unwrap();

        assert_eq!(state.path, Some(temp_dir.path().join("app.log")));
        assert_eq!(fs::read_to_string(temp_dir.path().join("app.log")).unwrap(), "");
    }

    #[test]
    fn test_open_failure_leaves_no_file() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("missing").join("app");
        let clock = ManualClock::new(OffsetDateTime::now_utc());
        let mut state = state_at(&base, SinkConfig::default(), &clock);

        let result = rotate(&mut state, clock.now());

        assert!(matches!(result, Err(Error::Open { .. })));
        assert!(state.file.is_none());
    }

    #[test]
    fn test_snapshot_skips_directories() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("b.log"), b"b").unwrap();
        fs::write(dir.join("a.log"), b"a").unwrap();
        fs::create_dir(dir.join("backup")).unwrap();

        let files = snapshot_files(dir).unwrap();

        assert_eq!(files, vec![dir.join("a.log"), dir.join("b.log")]);
    }
}
