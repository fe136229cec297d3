//! Date-range and URI keyword selection of normalized records.

use analytics_core::error::Result;
use analytics_core::models::NormalizedRecord;
use analytics_core::time_utils::{day_bounds, parse_timestamp};
use chrono::NaiveDateTime;
use tracing::warn;

/// A parsed date range plus keyword set.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    lower: NaiveDateTime,
    upper: NaiveDateTime,
    keywords: Vec<String>,
}

impl RecordFilter {
    /// Build a filter for `[start 00:00:00, end 23:59:59)`.
    ///
    /// Fails with `InvalidDate` when either boundary is not `YYYY-MM-DD`.
    pub fn new(start_date: &str, end_date: &str, filter: &str) -> Result<Self> {
        let (lower, upper) = day_bounds(start_date, end_date)?;
        Ok(Self {
            lower,
            upper,
            keywords: filter.split_whitespace().map(str::to_string).collect(),
        })
    }

    /// `true` when every keyword occurs in `uri`.
    pub fn matches_uri(&self, uri: &str) -> bool {
        self.keywords.iter().all(|k| uri.contains(k.as_str()))
    }

    /// `true` when `ts` lies in the half-open range.
    pub fn contains_time(&self, ts: NaiveDateTime) -> bool {
        ts >= self.lower && ts < self.upper
    }

    /// Check one record. Records with an unparseable timestamp never match.
    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        let Some(ts) = parse_timestamp(&record.timestamp) else {
            warn!("Failed to parse entry timestamp \"{}\"", record.timestamp);
            return false;
        };
        self.contains_time(ts) && self.matches_uri(&record.uri)
    }

    /// Keep matching records, in input order.
    pub fn apply(&self, records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// One-shot form of [`RecordFilter::new`] followed by [`RecordFilter::apply`].
pub fn filter_records(
    records: Vec<NormalizedRecord>,
    start_date: &str,
    end_date: &str,
    filter: &str,
) -> Result<Vec<NormalizedRecord>> {
    Ok(RecordFilter::new(start_date, end_date, filter)?.apply(records))
}
