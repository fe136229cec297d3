//! Daily stream and listener counting.
//!
//! A stream is a distinct (URI, client IP, user agent) on one date; a
//! listener is a distinct (client IP, user agent) on one date. Each newly
//! seen key bumps the `all` counter and the counter of the record's
//! [`Category`].

use std::collections::{BTreeMap, HashMap};

use analytics_core::models::{Category, DailyBucket, KeyScheme, NormalizedRecord, ResultSet};

// ── Keys ──────────────────────────────────────────────────────────────────────

/// Deduplication key for one date.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    /// Fields glued together with no separator.
    Concatenated(String),
    /// Fields kept apart.
    Structured(Vec<String>),
}

impl DedupKey {
    fn build(scheme: KeyScheme, parts: &[&str]) -> Self {
        match scheme {
            KeyScheme::Concatenated => DedupKey::Concatenated(parts.concat()),
            KeyScheme::Structured => {
                DedupKey::Structured(parts.iter().map(|p| p.to_string()).collect())
            }
        }
    }
}

/// Stream key: URI, IP, user agent.
pub fn stream_key(scheme: KeyScheme, record: &NormalizedRecord) -> DedupKey {
    DedupKey::build(
        scheme,
        &[
            record.uri.as_str(),
            record.real_ip.as_str(),
            record.user_agent.as_str(),
        ],
    )
}

/// Listener key: IP, user agent.
pub fn listener_key(scheme: KeyScheme, record: &NormalizedRecord) -> DedupKey {
    DedupKey::build(scheme, &[record.real_ip.as_str(), record.user_agent.as_str()])
}

// ── Per-day state ─────────────────────────────────────────────────────────────

/// Seen keys for one date, each remembered with the category that first
/// produced it.
#[derive(Debug)]
struct DayState {
    bucket: DailyBucket,
    streams: HashMap<DedupKey, Category>,
    listeners: HashMap<DedupKey, Category>,
}

impl DayState {
    fn new(date: &str) -> Self {
        Self {
            bucket: DailyBucket::new(date),
            streams: HashMap::new(),
            listeners: HashMap::new(),
        }
    }

    fn see_stream(&mut self, key: DedupKey, category: Category) {
        if !self.streams.contains_key(&key) {
            self.streams.insert(key, category);
            self.bucket.add_stream(category);
        }
    }

    fn see_listener(&mut self, key: DedupKey, category: Category) {
        if !self.listeners.contains_key(&key) {
            self.listeners.insert(key, category);
            self.bucket.add_listener(category);
        }
    }
}

// ── StreamAggregator ──────────────────────────────────────────────────────────

/// Incremental per-date deduplicating counter.
#[derive(Debug)]
pub struct StreamAggregator {
    scheme: KeyScheme,
    days: BTreeMap<String, DayState>,
}

impl StreamAggregator {
    pub fn new(scheme: KeyScheme) -> Self {
        Self {
            scheme,
            days: BTreeMap::new(),
        }
    }

    /// Fold one record into its date's counters.
    pub fn add_record(&mut self, record: &NormalizedRecord) {
        if record.size <= 0 {
            return;
        }

        let date = record.date();
        let category = Category::from_user_agent(&record.user_agent);
        let stream = stream_key(self.scheme, record);
        let listener = listener_key(self.scheme, record);

        let day = self
            .days
            .entry(date.to_string())
            .or_insert_with(|| DayState::new(date));
        day.see_stream(stream, category);
        day.see_listener(listener, category);
    }

    /// Fold a batch of records, in order.
    pub fn extend<'a>(&mut self, records: impl IntoIterator<Item = &'a NormalizedRecord>) {
        for record in records {
            self.add_record(record);
        }
    }

    /// Absorb another aggregator built over a later chunk of the same input.
    ///
    /// Seen keys are unioned per date; a key already present here keeps its
    /// category, so merging chunk aggregates in input order gives the same
    /// counts as one pass over the whole input. Both sides must use the
    /// same [`KeyScheme`].
    pub fn merge(&mut self, other: StreamAggregator) {
        debug_assert_eq!(
            self.scheme, other.scheme,
            "cannot merge aggregators with different key schemes"
        );
        for (date, theirs) in other.days {
            let ours = self
                .days
                .entry(date)
                .or_insert_with_key(|d| DayState::new(d));
            for (key, category) in theirs.streams {
                ours.see_stream(key, category);
            }
            for (key, category) in theirs.listeners {
                ours.see_listener(key, category);
            }
        }
    }

    /// Number of dates observed so far.
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Release the seen-key sets and return the buckets, ascending by date.
    pub fn finish(self) -> ResultSet {
        ResultSet {
            time_series: self.days.into_values().map(|d| d.bucket).collect(),
        }
    }
}

/// Aggregate `records` in one pass.
pub fn count_streams_and_listeners(records: &[NormalizedRecord], scheme: KeyScheme) -> ResultSet {
    let mut aggregator = StreamAggregator::new(scheme);
    aggregator.extend(records);
    aggregator.finish()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_core::models::CountGroup;
    use std::collections::HashSet;

    const SPOTIFY_UA: &str = "Spotify/8.9.10 Android/34";
    const CHROME_UA: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0 Safari/537.36";
    const OTHER_UA: &str = "Overcast/3.0 (+http://overcast.fm/)";

    fn record(ts: &str, uri: &str, ip: &str, ua: &str, size: i64) -> NormalizedRecord {
        NormalizedRecord {
            timestamp: ts.to_string(),
            real_ip: ip.to_string(),
            uri: uri.to_string(),
            user_agent: ua.to_string(),
            size,
        }
    }

    fn group(streams: u64, listeners: u64) -> CountGroup {
        CountGroup { streams, listeners }
    }

    fn assert_partition(bucket: &DailyBucket) {
        assert_eq!(
            bucket.native.streams + bucket.web.streams + bucket.other.streams,
            bucket.all.streams
        );
        assert_eq!(
            bucket.native.listeners + bucket.web.listeners + bucket.other.listeners,
            bucket.all.listeners
        );
    }

    // ── count_streams_and_listeners ───────────────────────────────────────────

    #[test]
    fn test_native_and_repeated_web_request() {
        let records = vec![
            record("2024-01-01 08:00:00", "/ep/3?x=1", "10.0.0.1", SPOTIFY_UA, 500),
            record("2024-01-01 09:00:00", "/ep/3?x=1", "10.0.0.2", CHROME_UA, 200),
            record("2024-01-01 09:05:00", "/ep/3?x=1", "10.0.0.2", CHROME_UA, 300),
        ];
        let result = count_streams_and_listeners(&records, KeyScheme::Concatenated);

        assert_eq!(result.time_series.len(), 1);
        let bucket = result.bucket("2024-01-01").unwrap();
        assert_eq!(bucket.all, group(2, 2));
        assert_eq!(bucket.native, group(1, 1));
        assert_eq!(bucket.web, group(1, 1));
        assert_eq!(bucket.other, group(0, 0));
    }

    #[test]
    fn test_same_listener_many_episodes() {
        let records = vec![
            record("2024-01-01 08:00:00", "/ep/1", "10.0.0.1", OTHER_UA, 1),
            record("2024-01-01 08:10:00", "/ep/2", "10.0.0.1", OTHER_UA, 1),
            record("2024-01-01 08:20:00", "/ep/3", "10.0.0.1", OTHER_UA, 1),
        ];
        let result = count_streams_and_listeners(&records, KeyScheme::Concatenated);
        let bucket = result.bucket("2024-01-01").unwrap();
        assert_eq!(bucket.all, group(3, 1));
        assert_eq!(bucket.other, group(3, 1));
    }

    #[test]
    fn test_keys_are_scoped_per_date() {
        let records = vec![
            record("2024-01-01 23:00:00", "/ep/1", "10.0.0.1", SPOTIFY_UA, 1),
            record("2024-01-02 01:00:00", "/ep/1", "10.0.0.1", SPOTIFY_UA, 1),
        ];
        let result = count_streams_and_listeners(&records, KeyScheme::Concatenated);
        assert_eq!(result.time_series.len(), 2);
        for bucket in &result.time_series {
            assert_eq!(bucket.all, group(1, 1));
        }
    }

    #[test]
    fn test_buckets_sorted_by_date() {
        let records = vec![
            record("2024-01-03 08:00:00", "/a", "1", "x", 1),
            record("2024-01-01 08:00:00", "/a", "1", "x", 1),
            record("2024-01-02 08:00:00", "/a", "1", "x", 1),
        ];
        let result = count_streams_and_listeners(&records, KeyScheme::Concatenated);
        let dates: Vec<&str> = result.time_series.iter().map(|b| b.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
    }

    #[test]
    fn test_non_positive_size_never_counts() {
        let records = vec![
            record("2024-01-01 08:00:00", "/a", "1", "x", 0),
            record("2024-01-01 08:00:00", "/b", "2", "y", -5),
        ];
        let result = count_streams_and_listeners(&records, KeyScheme::Concatenated);
        assert!(result.time_series.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let result = count_streams_and_listeners(&[], KeyScheme::Structured);
        assert!(result.time_series.is_empty());
    }

    #[test]
    fn test_dedup_matches_distinct_counts() {
        let uris = ["/ep/1", "/ep/2"];
        let ips = ["10.0.0.1", "10.0.0.2", "10.0.0.3"];
        let uas = [SPOTIFY_UA, CHROME_UA, OTHER_UA];
        let mut records = Vec::new();
        for (i, uri) in uris.iter().enumerate() {
            for (j, ip) in ips.iter().enumerate() {
                // Each IP uses one UA, repeated on purpose.
                let ua = uas[(i + j) % uas.len()];
                records.push(record("2024-01-01 10:00:00", uri, ip, ua, 10));
                records.push(record("2024-01-01 11:00:00", uri, ip, ua, 10));
            }
        }

        let expected_streams: HashSet<(String, String, String)> = records
            .iter()
            .map(|r| (r.uri.clone(), r.real_ip.clone(), r.user_agent.clone()))
            .collect();
        let expected_listeners: HashSet<(String, String)> = records
            .iter()
            .map(|r| (r.real_ip.clone(), r.user_agent.clone()))
            .collect();

        let result = count_streams_and_listeners(&records, KeyScheme::Structured);
        let bucket = result.bucket("2024-01-01").unwrap();
        assert_eq!(bucket.all.streams as usize, expected_streams.len());
        assert_eq!(bucket.all.listeners as usize, expected_listeners.len());
        assert_partition(bucket);
    }

    // ── key schemes ───────────────────────────────────────────────────────────

    #[test]
    fn test_concatenated_keys_collide() {
        let a = record("2024-01-01 08:00:00", "/ep1", "0.0.0.1", "x", 1);
        let b = record("2024-01-01 08:00:00", "/ep10", ".0.0.1", "x", 1);
        assert_eq!(
            stream_key(KeyScheme::Concatenated, &a),
            stream_key(KeyScheme::Concatenated, &b)
        );

        let result = count_streams_and_listeners(&[a, b], KeyScheme::Concatenated);
        assert_eq!(result.time_series[0].all.streams, 1);
        assert_eq!(result.time_series[0].all.listeners, 2);
    }

    #[test]
    fn test_structured_keys_do_not_collide() {
        let a = record("2024-01-01 08:00:00", "/ep1", "0.0.0.1", "x", 1);
        let b = record("2024-01-01 08:00:00", "/ep10", ".0.0.1", "x", 1);
        assert_ne!(
            stream_key(KeyScheme::Structured, &a),
            stream_key(KeyScheme::Structured, &b)
        );

        let result = count_streams_and_listeners(&[a, b], KeyScheme::Structured);
        assert_eq!(result.time_series[0].all.streams, 2);
    }

    #[test]
    fn test_listener_key_ignores_uri() {
        let a = record("2024-01-01 08:00:00", "/ep1", "10.0.0.1", "x", 1);
        let b = record("2024-01-01 08:00:00", "/ep2", "10.0.0.1", "x", 1);
        assert_eq!(
            listener_key(KeyScheme::Structured, &a),
            listener_key(KeyScheme::Structured, &b)
        );
    }

    // ── merge ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_merge_equals_single_pass() {
        let records = vec![
            record("2024-01-01 08:00:00", "/ep/1", "10.0.0.1", SPOTIFY_UA, 1),
            record("2024-01-01 09:00:00", "/ep/2", "10.0.0.1", SPOTIFY_UA, 1),
            record("2024-01-01 10:00:00", "/ep/1", "10.0.0.2", CHROME_UA, 1),
            record("2024-01-02 08:00:00", "/ep/1", "10.0.0.1", SPOTIFY_UA, 1),
            record("2024-01-01 11:00:00", "/ep/1", "10.0.0.1", SPOTIFY_UA, 1),
            record("2024-01-02 09:00:00", "/ep/3", "10.0.0.3", OTHER_UA, 1),
        ];
        let single = count_streams_and_listeners(&records, KeyScheme::Concatenated);

        let (head, tail) = records.split_at(3);
        let mut first = StreamAggregator::new(KeyScheme::Concatenated);
        first.extend(head);
        let mut second = StreamAggregator::new(KeyScheme::Concatenated);
        second.extend(tail);
        first.merge(second);

        assert_eq!(first.len(), 2);
        assert_eq!(first.finish(), single);
    }

    #[test]
    fn test_merge_into_empty() {
        let mut empty = StreamAggregator::new(KeyScheme::Structured);
        assert!(empty.is_empty());

        let mut other = StreamAggregator::new(KeyScheme::Structured);
        other.add_record(&record("2024-01-01 08:00:00", "/a", "1", "x", 1));
        empty.merge(other);

        let result = empty.finish();
        assert_eq!(result.time_series.len(), 1);
        assert_eq!(result.time_series[0].all, group(1, 1));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "different key schemes")]
    fn test_merge_rejects_mixed_key_schemes() {
        let mut concatenated = StreamAggregator::new(KeyScheme::Concatenated);
        let mut structured = StreamAggregator::new(KeyScheme::Structured);
        structured.add_record(&record("2024-01-01 08:00:00", "/a", "1", "x", 1));
        concatenated.merge(structured);
    }
}
