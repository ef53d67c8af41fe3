use std::sync::{Arc, Mutex, PoisonError};

use time::{Duration, OffsetDateTime, UtcOffset};

/// A source of wall-clock time for the sink.
///
/// Rotation decisions, header/trailer timestamps and archive names all read
/// the time through this trait, so day changes can be simulated in tests.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time in the clock's offset.
    fn now(&self) -> OffsetDateTime;
}

/// A clock backed by the system time, expressed in the local offset.
///
/// The local offset is resolved once at construction. Resolving it later from
/// a multi-threaded process is not always possible, in which case UTC is used.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        }
    }

    pub fn utc() -> Self {
        Self {
            offset: UtcOffset::UTC,
        }
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a test can keep one handle while the
/// sink owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<OffsetDateTime>>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, now: OffsetDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Month, Time};

    fn start() -> OffsetDateTime {
        Date::from_calendar_date(2026, Month::March, 31)
            .unwrap()
            .with_time(Time::from_hms(23, 59, 0).unwrap())
            .assume_utc()
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(start());
        let observer = clock.clone();

        clock.advance(Duration::minutes(2));

        let now = observer.now();
        assert_eq!(now.month(), Month::April);
        assert_eq!(now.day(), 1);
        assert_eq!(now.minute(), 1);
    }

    #[test]
    fn system_clock_utc_has_zero_offset() {
        let clock = SystemClock::utc();
        assert_eq!(clock.now().offset(), UtcOffset::UTC);
    }
}
