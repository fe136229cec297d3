use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::{AnalyticsError, Result};

/// Fixed layout of every formatted record timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layout of boundary dates and daily bucket keys.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Start date used when neither explicit dates nor `--last` are given.
pub const EARLIEST_DATE: &str = "2020-01-01";

// ── Time zone resolution ──────────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a time zone setting into a [`Tz`].
///
/// `"auto"` uses the host zone and degrades to UTC with a warning when the
/// host reports something chrono-tz does not know. Any other value must be
/// a valid IANA identifier.
pub fn resolve_timezone(name: &str) -> Result<Tz> {
    if name.eq_ignore_ascii_case("auto") {
        let system = get_system_timezone();
        return Ok(system.parse::<Tz>().unwrap_or_else(|_| {
            warn!("unrecognised system timezone \"{}\", using UTC", system);
            Tz::UTC
        }));
    }
    name.parse::<Tz>()
        .map_err(|_| AnalyticsError::InvalidTimezone(name.to_string()))
}

// ── Formatting and parsing ────────────────────────────────────────────────────

/// Format epoch seconds as `YYYY-MM-DD HH:MM:SS` in `tz`.
///
/// The fractional part is truncated toward zero. Returns `None` when the
/// value cannot be represented as a date-time.
pub fn format_epoch_seconds(ts: f64, tz: &Tz) -> Option<String> {
    if !ts.is_finite() {
        return None;
    }
    let secs = ts.trunc() as i64;
    let utc = DateTime::<Utc>::from_timestamp(secs, 0)?;
    Some(utc.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string())
}

/// Parse a formatted record timestamp.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok()
}

/// Parse a `YYYY-MM-DD` date with zero-padded month and day.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let invalid = || AnalyticsError::InvalidDate {
        value: s.to_string(),
    };
    if s.len() != 10 {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| invalid())
}

/// Bounds of a date-range query: `start 00:00:00` and `end 23:59:59`.
///
/// Callers compare with `>= lower` and `< upper`, so the last second of the
/// end date is outside the range.
pub fn day_bounds(start: &str, end: &str) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let lower = parse_date(start)?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AnalyticsError::InvalidDate {
            value: start.to_string(),
        })?;
    let upper = parse_date(end)?
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| AnalyticsError::InvalidDate {
            value: end.to_string(),
        })?;
    Ok((lower, upper))
}

// ── Date ranges ───────────────────────────────────────────────────────────────

/// Current calendar date in `tz`.
pub fn today_in(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

/// Resolve a "last N days" request into `(start, end)` date strings.
///
/// `Some(n)` with `n >= 0` spans `today - n` to `today`; anything else spans
/// from [`EARLIEST_DATE`] to `today`.
pub fn resolve_date_range(last_days: Option<i64>, today: NaiveDate) -> (String, String) {
    let end = today.format(DATE_FORMAT).to_string();
    let start = match last_days {
        Some(n) if n >= 0 => (today - Duration::days(n))
            .format(DATE_FORMAT)
            .to_string(),
        _ => EARLIEST_DATE.to_string(),
    };
    (start, end)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
