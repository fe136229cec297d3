//! Flattening of [`RawLogEntry`] into [`NormalizedRecord`].

use analytics_core::models::{NormalizedRecord, RawLogEntry};
use analytics_core::time_utils::format_epoch_seconds;
use chrono_tz::Tz;
use tracing::warn;

/// Header carrying the client address set by the front proxy.
pub const REAL_IP_HEADER: &str = "X-Real-Ip";
/// Fallback client address header.
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";
pub const USER_AGENT_HEADER: &str = "User-Agent";

/// Converts raw entries into records, formatting timestamps in one zone.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    timezone: Tz,
}

impl Normalizer {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Normalize one entry; `None` when nothing was delivered (`size <= 0`)
    /// or the timestamp is out of range.
    pub fn normalize(&self, entry: RawLogEntry) -> Option<NormalizedRecord> {
        if entry.size <= 0 {
            return None;
        }

        let Some(timestamp) = format_epoch_seconds(entry.ts, &self.timezone) else {
            warn!("Skipping entry with unrepresentable timestamp {}", entry.ts);
            return None;
        };

        let real_ip = extract_real_ip(&entry).to_string();
        let user_agent = extract_user_agent(&entry).to_string();

        Some(NormalizedRecord {
            timestamp,
            real_ip,
            uri: entry.request.uri,
            user_agent,
            size: entry.size,
        })
    }

    /// Normalize a batch, keeping input order.
    pub fn normalize_all(
        &self,
        entries: impl IntoIterator<Item = RawLogEntry>,
    ) -> Vec<NormalizedRecord> {
        entries
            .into_iter()
            .filter_map(|e| self.normalize(e))
            .collect()
    }
}

/// Client address: `X-Real-Ip`, then `X-Forwarded-For`, then empty.
pub fn extract_real_ip(entry: &RawLogEntry) -> &str {
    entry
        .first_header(REAL_IP_HEADER)
        .or_else(|| entry.first_header(FORWARDED_FOR_HEADER))
        .unwrap_or("")
}

/// First `User-Agent` value, or empty.
pub fn extract_user_agent(entry: &RawLogEntry) -> &str {
    entry.first_header(USER_AGENT_HEADER).unwrap_or("")
}
