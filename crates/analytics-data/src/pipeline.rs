//! End-to-end run: decode, normalize, filter, aggregate.

use std::time::Instant;

use analytics_core::error::Result;
use analytics_core::models::{NormalizedRecord, QueryParams, ResultSet};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregator::count_streams_and_listeners;
use crate::filter::RecordFilter;
use crate::normalizer::Normalizer;
use crate::reader::{load_log_entries, CorruptLine};

/// Counters describing one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub lines_read: usize,
    pub lines_skipped: usize,
    pub lines_corrupt: usize,
    /// Records left after dropping empty responses.
    pub records_normalized: usize,
    /// Records inside the date range and matching every keyword.
    pub records_matched: usize,
}

/// Filtered records plus the run counters.
#[derive(Debug, Clone)]
pub struct FilteredRecords {
    pub records: Vec<NormalizedRecord>,
    pub corrupt: Vec<CorruptLine>,
    pub stats: PipelineStats,
}

/// The aggregate plus the run counters.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub result: ResultSet,
    pub corrupt: Vec<CorruptLine>,
    pub stats: PipelineStats,
}

/// Decode, normalize and filter the log named in `params`.
///
/// The date range is validated before the file is opened.
pub fn collect_records(params: &QueryParams) -> Result<FilteredRecords> {
    let filter = RecordFilter::new(&params.start_date, &params.end_date, &params.filter)?;

    let load_start = Instant::now();
    let report = load_log_entries(&params.log_path, params.ingest_policy)?;
    let load_time = load_start.elapsed();

    let mut stats = PipelineStats {
        lines_read: report.lines_read,
        lines_skipped: report.lines_skipped,
        lines_corrupt: report.corrupt.len(),
        ..PipelineStats::default()
    };

    let normalized = Normalizer::new(params.timezone).normalize_all(report.entries);
    stats.records_normalized = normalized.len();

    let records = filter.apply(normalized);
    stats.records_matched = records.len();

    if stats.lines_corrupt > 0 {
        warn!(
            "{} corrupt lines skipped in {}",
            stats.lines_corrupt,
            params.log_path.display()
        );
    }
    info!(
        "Loaded {} lines from {} in {:.3}s; {} records normalized, {} matched {}..{} filter \"{}\"",
        stats.lines_read,
        params.log_path.display(),
        load_time.as_secs_f64(),
        stats.records_normalized,
        stats.records_matched,
        params.start_date,
        params.end_date,
        params.filter,
    );

    Ok(FilteredRecords {
        records,
        corrupt: report.corrupt,
        stats,
    })
}

/// Run the whole pipeline and return the daily time series.
pub fn run(params: &QueryParams) -> Result<RunSummary> {
    let filtered = collect_records(params)?;
    let result = count_streams_and_listeners(&filtered.records, params.key_scheme);

    info!("Aggregated {} days", result.time_series.len());

    Ok(RunSummary {
        result,
        corrupt: filtered.corrupt,
        stats: filtered.stats,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
