//! Access-log loading.
//!
//! Reads newline-delimited, percent-encoded JSON records written by the
//! reverse proxy and turns them into [`RawLogEntry`] structs. Lines that
//! look truncated are skipped; lines that look complete but are not valid
//! JSON are handled according to the [`IngestPolicy`].

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use analytics_core::error::{AnalyticsError, Result};
use analytics_core::models::{IngestPolicy, RawLogEntry};
use percent_encoding::percent_decode;
use tracing::{debug, warn};

// ── Line outcomes ─────────────────────────────────────────────────────────────

/// Why a line was dropped without being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A `%` not followed by two hex digits.
    Undecodable,
    /// Blank, or no closing brace anywhere on the line.
    Incomplete,
}

/// Result of decoding a single line.
#[derive(Debug)]
pub enum LineOutcome {
    Entry(RawLogEntry),
    Skipped(SkipReason),
    /// Looked complete, but JSON decoding failed.
    Corrupt(serde_json::Error),
}

/// A corrupt line kept by [`IngestPolicy::Lenient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptLine {
    /// 1-based line number.
    pub line: usize,
    pub error: String,
}

/// Everything produced by one pass over a log file.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Decoded entries in file order.
    pub entries: Vec<RawLogEntry>,
    pub lines_read: usize,
    pub lines_skipped: usize,
    pub corrupt: Vec<CorruptLine>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load every entry from the access log at `path`.
///
/// Fails when the file cannot be opened or read, and, under
/// [`IngestPolicy::Strict`], on the first corrupt line.
pub fn load_log_entries(path: &Path, policy: IngestPolicy) -> Result<IngestReport> {
    let file = File::open(path).map_err(|source| AnalyticsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    read_log_entries(BufReader::new(file), path, policy)
}

/// Same as [`load_log_entries`] over any buffered reader. `path` is only
/// used in error messages.
pub fn read_log_entries<R: BufRead>(
    reader: R,
    path: &Path,
    policy: IngestPolicy,
) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    for (index, line_result) in reader.split(b'\n').enumerate() {
        let line_no = index + 1;
        let mut line = line_result.map_err(|source| AnalyticsError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        report.lines_read += 1;

        match decode_line(&line) {
            LineOutcome::Entry(entry) => report.entries.push(entry),
            LineOutcome::Skipped(reason) => {
                match reason {
                    SkipReason::Undecodable => {
                        warn!("Failed to decode line {} in {}", line_no, path.display())
                    }
                    SkipReason::Incomplete => debug!(
                        "Skipping incomplete log entry at line {} in {}",
                        line_no,
                        path.display()
                    ),
                }
                report.lines_skipped += 1;
            }
            LineOutcome::Corrupt(source) => match policy {
                IngestPolicy::Strict => {
                    return Err(AnalyticsError::CorruptLine {
                        path: path.to_path_buf(),
                        line: line_no,
                        source,
                    });
                }
                IngestPolicy::Lenient => {
                    warn!(
                        "Corrupt JSON at line {} in {}: {}",
                        line_no,
                        path.display(),
                        source
                    );
                    report.corrupt.push(CorruptLine {
                        line: line_no,
                        error: source.to_string(),
                    });
                }
            },
        }
    }

    debug!(
        "File {}: {} read, {} skipped, {} corrupt, {} decoded",
        path.display(),
        report.lines_read,
        report.lines_skipped,
        report.corrupt.len(),
        report.entries.len(),
    );

    Ok(report)
}

/// Decode one raw line (without its newline).
pub fn decode_line(raw: &[u8]) -> LineOutcome {
    let Some(clean) = query_unescape(raw) else {
        return LineOutcome::Skipped(SkipReason::Undecodable);
    };

    if clean.trim().is_empty() || !clean.contains('}') {
        return LineOutcome::Skipped(SkipReason::Incomplete);
    }

    match serde_json::from_str::<RawLogEntry>(&clean) {
        Ok(entry) => LineOutcome::Entry(entry),
        Err(e) => LineOutcome::Corrupt(e),
    }
}

/// Query-string unescaping: `+` becomes a space and `%XX` becomes the byte
/// `0xXX`.
///
/// Returns `None` for a `%` that is not followed by two hex digits. Decoded
/// bytes that are not UTF-8 become U+FFFD.
pub fn query_unescape(raw: &[u8]) -> Option<String> {
    if !has_valid_escapes(raw) {
        return None;
    }
    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    Some(percent_decode(&spaced).decode_utf8_lossy().into_owned())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn has_valid_escapes(raw: &[u8]) -> bool {
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let hex = raw.get(i + 1..i + 3);
            if !hex.is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit)) {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

// ── Tests ─────────────────────────────────────────────────────────────────────
