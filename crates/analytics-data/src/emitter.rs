//! Writing results to stdout and an optional file.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use analytics_core::error::{AnalyticsError, Result};
use analytics_core::models::{NormalizedRecord, ResultSet};
use serde::Serialize;
use tracing::info;

/// Compact JSON followed by a newline.
pub fn to_json_line<T: Serialize>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string(value)?;
    json.push('\n');
    Ok(json)
}

/// One compact JSON object per record, newline-terminated.
pub fn records_to_json_lines(records: &[NormalizedRecord]) -> Result<String> {
    let mut out = String::new();
    for record in records {
        out.push_str(&to_json_line(record)?);
    }
    Ok(out)
}

/// Write `payload` to `stdout`, then to `output_path` when given.
///
/// A stdout failure is returned before the file is created.
pub fn write_outputs<W: Write>(
    payload: &str,
    mut stdout: W,
    output_path: Option<&Path>,
) -> Result<()> {
    stdout
        .write_all(payload.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(AnalyticsError::Stdout)?;

    if let Some(path) = output_path {
        let file_err = |source| AnalyticsError::FileWrite {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::create(path).map_err(file_err)?;
        file.write_all(payload.as_bytes()).map_err(file_err)?;
        info!("Result saved to {}", path.display());
    }

    Ok(())
}

/// Emit the time series to the process stdout and the optional file.
pub fn emit_result(result: &ResultSet, output_path: Option<&Path>) -> Result<()> {
    let payload = to_json_line(result)?;
    write_outputs(&payload, std::io::stdout().lock(), output_path)
}

/// Emit filtered records as JSON lines to stdout and the optional file.
pub fn emit_records(records: &[NormalizedRecord], output_path: Option<&Path>) -> Result<()> {
    let payload = records_to_json_lines(records)?;
    write_outputs(&payload, std::io::stdout().lock(), output_path)
}
