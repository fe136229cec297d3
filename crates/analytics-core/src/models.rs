use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

// ── Input ─────────────────────────────────────────────────────────────────────

/// The `request` object nested inside a proxy access-log line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRequest {
    /// Request URI including the query string.
    #[serde(default, deserialize_with = "null_as_default")]
    pub uri: String,
    /// Header name to ordered list of values, names as the proxy wrote them.
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: HashMap<String, Vec<String>>,
}

/// One decoded access-log line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLogEntry {
    /// Seconds since the Unix epoch; fractional part is ignored downstream.
    #[serde(default, deserialize_with = "null_as_default")]
    pub ts: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub request: RawRequest,
    /// Response size in bytes. Zero or negative for redirects and errors.
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: i64,
}

/// Accept an explicit JSON `null` wherever a missing field is accepted.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl RawLogEntry {
    /// First value of `name`, or `None` when the header is absent or empty.
    pub fn first_header(&self, name: &str) -> Option<&str> {
        self.request
            .headers
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// A flattened log record that survived the size filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    /// `YYYY-MM-DD HH:MM:SS` in the configured time zone.
    pub timestamp: String,
    pub real_ip: String,
    pub uri: String,
    pub user_agent: String,
    /// Always strictly positive.
    pub size: i64,
}

impl NormalizedRecord {
    /// Calendar date part of the timestamp (`YYYY-MM-DD`).
    pub fn date(&self) -> &str {
        self.timestamp.get(..10).unwrap_or(&self.timestamp)
    }
}

// ── Classification ────────────────────────────────────────────────────────────

/// Client family a user agent belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// The streaming platform's own app.
    #[serde(rename = "spotify")]
    Native,
    /// Desktop or mobile browser.
    Web,
    /// Podcatchers, bots and anything unrecognised.
    Other,
}

// ── Output ────────────────────────────────────────────────────────────────────

/// Stream and listener counters for one category on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountGroup {
    pub streams: u64,
    pub listeners: u64,
}

/// All counters for one calendar date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub date: String,
    pub all: CountGroup,
    #[serde(rename = "spotify")]
    pub native: CountGroup,
    pub web: CountGroup,
    pub other: CountGroup,
}

impl DailyBucket {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Self::default()
        }
    }

    /// Counter group for `category`.
    pub fn group(&self, category: Category) -> &CountGroup {
        match category {
            Category::Native => &self.native,
            Category::Web => &self.web,
            Category::Other => &self.other,
        }
    }

    fn group_mut(&mut self, category: Category) -> &mut CountGroup {
        match category {
            Category::Native => &mut self.native,
            Category::Web => &mut self.web,
            Category::Other => &mut self.other,
        }
    }

    /// Count one new stream for `category` and for the `all` group.
    pub fn add_stream(&mut self, category: Category) {
        self.all.streams += 1;
        self.group_mut(category).streams += 1;
    }

    /// Count one new listener for `category` and for the `all` group.
    pub fn add_listener(&mut self, category: Category) {
        self.all.listeners += 1;
        self.group_mut(category).listeners += 1;
    }
}

/// The terminal aggregate: one bucket per observed date, ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(rename = "timeSeries")]
    pub time_series: Vec<DailyBucket>,
}

impl ResultSet {
    /// Bucket for `date`, if that date was observed.
    pub fn bucket(&self, date: &str) -> Option<&DailyBucket> {
        self.time_series.iter().find(|b| b.date == date)
    }
}

// ── Query parameters ──────────────────────────────────────────────────────────

/// How stream and listener keys are built from record fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum KeyScheme {
    /// Bare concatenation of the fields; triples that concatenate to the
    /// same string count once.
    #[default]
    Concatenated,
    /// Field tuples; distinct triples never collide.
    Structured,
}

/// What the decoder does with a line that looked complete but is not JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IngestPolicy {
    /// Abort the whole ingestion.
    #[default]
    Strict,
    /// Record the line in the ingest report and continue.
    Lenient,
}

/// Everything one pipeline run needs.
#[derive(Debug, Clone)]
pub struct QueryParams {
    pub log_path: PathBuf,
    /// Inclusive start date, `YYYY-MM-DD`.
    pub start_date: String,
    /// End date, `YYYY-MM-DD`. Records at `23:59:59` on this day are excluded.
    pub end_date: String,
    /// Space-separated keywords that must all appear in the URI.
    pub filter: String,
    /// Optional file to mirror the JSON result into.
    pub output_path: Option<PathBuf>,
    pub timezone: Tz,
    pub key_scheme: KeyScheme,
    pub ingest_policy: IngestPolicy,
}

impl QueryParams {
    /// Params with defaults for everything but the input path and dates.
    pub fn new(
        log_path: impl Into<PathBuf>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            log_path: log_path.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            filter: String::new(),
            output_path: None,
            timezone: Tz::UTC,
            key_scheme: KeyScheme::default(),
            ingest_policy: IngestPolicy::default(),
        }
    }
}
