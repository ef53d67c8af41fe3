//! Rotation policy evaluation logic.

use time::Date;

/// Why a rotation was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationReason {
    Lines,
    Size,
    Daily,
}

impl RotationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RotationReason::Lines => "line limit",
            RotationReason::Size => "size limit",
            RotationReason::Daily => "day change",
        }
    }
}

/// Records and bytes written to the current file since it was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub lines: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationPolicy {
    pub max_lines: u64,
    pub max_size: u64,
    pub daily: bool,
}

impl RotationPolicy {
    /// Evaluate whether the next write must go to a fresh file.
    ///
    /// Checked immediately before each write. Any satisfied trigger yields a
    /// single rotation; when several hold at once the first in
    /// lines/size/daily order is reported.
    ///
    /// # Arguments
    ///
    /// * `counters` - Counters of the currently open file
    /// * `opened_day` - Day the current file was opened, `None` if never
    /// * `today` - Current calendar day
    pub fn evaluate(
        &self,
        counters: Counters,
        opened_day: Option<Date>,
        today: Date,
    ) -> Option<RotationReason> {
        if self.max_lines > 0 && counters.lines >= self.max_lines {
            return Some(RotationReason::Lines);
        }
        if self.max_size > 0 && counters.bytes >= self.max_size {
            return Some(RotationReason::Size);
        }
        if self.daily && opened_day != Some(today) {
            return Some(RotationReason::Daily);
        }
        None
    }

    pub fn rotation_needed(&self, counters: Counters, opened_day: Option<Date>, today: Date) -> bool {
        self.evaluate(counters, opened_day, today).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    fn day(d: u8) -> Date {
        Date::from_calendar_date(2026, Month::May, d).unwrap()
    }

    fn counters(lines: u64, bytes: u64) -> Counters {
        Counters { lines, bytes }
    }

    #[test]
    fn test_disabled_policy_never_rotates() {
        let policy = RotationPolicy::default();
        assert!(!policy.rotation_needed(counters(u64::MAX, u64::MAX), Some(day(1)), day(2)));
    }

    #[test]
    fn test_line_threshold() {
        let policy = RotationPolicy {
            max_lines: 2,
            ..RotationPolicy::default()
        };
        assert!(!policy.rotation_needed(counters(1, 0), Some(day(1)), day(1)));
        assert_eq!(
            policy.evaluate(counters(2, 0), Some(day(1)), day(1)),
            Some(RotationReason::Lines)
        );
    }

    #[test]
    fn test_size_threshold_uses_pre_write_bytes() {
        let policy = RotationPolicy {
            max_size: 10,
            ..RotationPolicy::default()
        };
        assert!(!policy.rotation_needed(counters(3, 9), Some(day(1)), day(1)));
        assert_eq!(
            policy.evaluate(counters(3, 10), Some(day(1)), day(1)),
            Some(RotationReason::Size)
        );
    }

    #[test]
    fn test_daily_rotation() {
        let policy = RotationPolicy {
            daily: true,
            ..RotationPolicy::default()
        };
        assert!(!policy.rotation_needed(counters(0, 0), Some(day(1)), day(1)));
        assert_eq!(
            policy.evaluate(counters(0, 0), Some(day(1)), day(2)),
            Some(RotationReason::Daily)
        );
        assert!(policy.rotation_needed(counters(0, 0), None, day(1)));
    }

    #[test]
    fn test_same_day_of_month_in_next_month_rotates() {
        let policy = RotationPolicy {
            daily: true,
            ..RotationPolicy::default()
        };
        let june = Date::from_calendar_date(2026, Month::June, 1).unwrap();
        assert!(policy.rotation_needed(counters(0, 0), Some(day(1)), june));
    }

    #[test]
    fn test_daily_ignored_when_disabled() {
        let policy = RotationPolicy {
            max_lines: 5,
            ..RotationPolicy::default()
        };
        assert!(!policy.rotation_needed(counters(1, 1), Some(day(1)), day(9)));
    }
}
