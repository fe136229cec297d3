mod bootstrap;

use analytics_core::settings::{Command, Settings};
use analytics_data::emitter::{emit_records, emit_result};
use analytics_data::pipeline::{collect_records, run};
use anyhow::{Context, Result};

fn main() -> Result<()> {
    let settings = Settings::load().context("Failed to load configuration")?;

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("Podcast Analytics v{} starting", env!("CARGO_PKG_VERSION"));

    let params = settings
        .to_query_params()
        .context("Invalid settings")?;

    tracing::info!(
        "Log: {}, range: {}..{}, timezone: {}",
        params.log_path.display(),
        params.start_date,
        params.end_date,
        params.timezone
    );

    match settings.command() {
        Command::Streams => {
            let summary = run(&params).context("Failed to ingest data")?;
            emit_result(&summary.result, params.output_path.as_deref())?;
        }
        Command::Records => {
            let filtered = collect_records(&params).context("Failed to ingest data")?;
            emit_records(&filtered.records, params.output_path.as_deref())?;
        }
    }

    Ok(())
}
