//! Record rendering.
//!
//! The sink treats rendering as an opaque `format(template, record)` call. The
//! [`PatternFormatter`] shipped here understands the classic placeholders:
//!
//! | Verb | Output |
//! |------|--------|
//! | `%T` | time, `HH:MM:SS` |
//! | `%t` | time, `HH:MM` |
//! | `%D` | date, `YYYY/MM/DD` |
//! | `%d` | date, `MM/DD/YY` |
//! | `%L` | level tag (`INFO`, `WARN`, ...) |
//! | `%S` | source |
//! | `%s` | source after the last `/` |
//! | `%M` | message |
//! | `%%` | a literal `%` |
//!
//! Unknown verbs are copied through unchanged.

use std::fmt::Write;

use crate::record::LogRecord;

/// Renders a template against a record.
pub trait Formatter: Send + 'static {
    fn format(&self, template: &str, record: &LogRecord) -> String;
}

impl<F> Formatter for F
where
    F: Fn(&str, &LogRecord) -> String + Send + 'static,
{
    fn format(&self, template: &str, record: &LogRecord) -> String {
        self(template, record)
    }
}

/// Default `%`-placeholder formatter.
///
/// An empty template renders to nothing; any other template gets a trailing
/// newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternFormatter;

impl Formatter for PatternFormatter {
    fn format(&self, template: &str, record: &LogRecord) -> String {
        format_record(template, record)
    }
}

pub fn format_record(template: &str, record: &LogRecord) -> String {
    if template.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(template.len() + record.message.len() + 32);
    let created = record.created;
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        // write! into a String cannot fail
        let _ = match chars.next() {
            Some('T') => write!(
                out,
                "{:02}:{:02}:{:02}",
                created.hour(),
                created.minute(),
                created.second()
            ),
            Some('t') => write!(out, "{:02}:{:02}", created.hour(), created.minute()),
            Some('D') => write!(
                out,
                "{:04}/{:02}/{:02}",
                created.year(),
                created.month() as u8,
                created.day()
            ),
            Some('d') => write!(
                out,
                "{:02}/{:02}/{:02}",
                created.month() as u8,
                created.day(),
                created.year().rem_euclid(100)
            ),
            Some('L') => out.write_str(record.level.as_str()),
            Some('S') => out.write_str(&record.source),
            Some('s') => out.write_str(short_source(&record.source)),
            Some('M') => out.write_str(&record.message),
            Some('%') => out.write_char('%'),
            Some(other) => write!(out, "%{other}"),
            None => out.write_char('%'),
        };
    }
    out.push('\n');
    out
}

fn short_source(source: &str) -> &str {
    match source.rfind('/') {
        Some(idx) => &source[idx + 1..],
        None => source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Level;
    use time::{Date, Month, Time};

    fn record() -> LogRecord {
        let created = Date::from_calendar_date(2009, Month::February, 3)
            .unwrap()
            .with_time(Time::from_hms(4, 5, 6).unwrap())
            .assume_utc();
        LogRecord::new(Level::Warning, "net/conn.rs:42", "link down").with_created(created)
    }

    #[test]
    fn default_layout() {
        let line = format_record("[%D %T] [%L] (%S) %M", &record());
        assert_eq!(line, "[2009/02/03 04:05:06] [WARN] (net/conn.rs:42) link down\n");
    }

    #[test]
    fn short_forms() {
        let line = format_record("%d %t %s", &record());
        assert_eq!(line, "02/03/09 04:05 conn.rs:42\n");
    }

    #[test]
    fn empty_template_renders_nothing() {
        assert_eq!(format_record("", &record()), "");
    }

    #[test]
    fn percent_escapes_and_unknown_verbs() {
        assert_eq!(format_record("100%% %q %", &record()), "100% %q %\n");
    }

    #[test]
    fn closures_are_formatters() {
        let formatter = |template: &str, record: &LogRecord| format!("{template}:{}", record.message);
        assert_eq!(Formatter::format(&formatter, "x", &record()), "x:link down");
    }
}
