use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::error::{AnalyticsError, Result};
use crate::models::{IngestPolicy, KeyScheme, QueryParams};
use crate::time_utils::{parse_date, resolve_date_range, resolve_timezone, today_in};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Daily stream and listener counts from podcast access logs
#[derive(Parser, Debug, Clone)]
#[command(
    name = "podcast-analytics",
    about = "Daily stream and listener counts from podcast access logs",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Access log to read (one percent-encoded JSON record per line)
    #[arg(long, env = "LOG_PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// First day to include (YYYY-MM-DD)
    #[arg(long, global = true)]
    pub start: Option<String>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long, global = true)]
    pub end: Option<String>,

    /// Number of last days to include (default: all data)
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub last: Option<i64>,

    /// Keywords that must all appear in the request URI (episode, season...)
    #[arg(long, default_value = "", global = true)]
    pub filter: String,

    /// Also write the JSON result to this file
    #[arg(long, env = "OUTPUT_JSON", global = true)]
    pub output: Option<PathBuf>,

    /// Timezone used for calendar days (auto-detected if not specified)
    #[arg(long, env = "TIMEZONE", default_value = "auto", global = true)]
    pub timezone: String,

    /// How stream and listener keys are built
    #[arg(long, value_enum, default_value_t = KeyScheme::Concatenated, global = true)]
    pub key_scheme: KeyScheme,

    /// Skip corrupt JSON lines instead of aborting
    #[arg(long, global = true)]
    pub lenient: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"], global = true)]
    pub log_level: String,
}

/// What to print once the records are filtered.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    /// Daily stream and listener time series as JSON (default)
    #[default]
    Streams,
    /// Filtered records, one JSON object per line
    Records,
}

impl Settings {
    /// Load `.env`, then parse the process arguments.
    pub fn load() -> Result<Self> {
        Self::load_from_args(std::env::args_os().collect())
    }

    /// Same as [`load`](Self::load) with an explicit argument list.
    pub fn load_from_args(args: Vec<std::ffi::OsString>) -> Result<Self> {
        load_dotenv()?;
        Ok(Settings::parse_from(args))
    }

    /// Subcommand to run, defaulting to [`Command::Streams`].
    pub fn command(&self) -> Command {
        self.command.unwrap_or_default()
    }

    /// Build the pipeline parameters, resolving dates against today's date
    /// in the configured time zone.
    pub fn to_query_params(&self) -> Result<QueryParams> {
        let tz = resolve_timezone(&self.timezone)?;
        self.to_query_params_on(tz, today_in(&tz))
    }

    /// Build the pipeline parameters with an explicit zone and "today".
    ///
    /// Explicit `--start`/`--end` win; missing ends are filled from the
    /// `--last` range (or the all-data range).
    pub fn to_query_params_on(&self, tz: Tz, today: NaiveDate) -> Result<QueryParams> {
        let log_path = self.log_path.clone().ok_or_else(|| {
            AnalyticsError::Config("no log file given; pass --log-path or set LOG_PATH".into())
        })?;

        let (range_start, range_end) = resolve_date_range(self.last, today);
        let start_date = self.start.clone().unwrap_or(range_start);
        let end_date = self.end.clone().unwrap_or(range_end);
        parse_date(&start_date)?;
        parse_date(&end_date)?;

        let output_path = self
            .output
            .clone()
            .filter(|p| !p.as_os_str().is_empty());

        Ok(QueryParams {
            log_path,
            start_date,
            end_date,
            filter: self.filter.clone(),
            output_path,
            timezone: tz,
            key_scheme: self.key_scheme,
            ingest_policy: if self.lenient {
                IngestPolicy::Lenient
            } else {
                IngestPolicy::Strict
            },
        })
    }
}

// ── .env support ───────────────────────────────────────────────────────────────

/// Load `$ENV_FILE` or `./.env` into the process environment.
///
/// Variables that are already set are left untouched. Returns whether a file
/// was found; a file that exists but cannot be read or parsed is an error.
pub fn load_dotenv() -> Result<bool> {
    let path = std::env::var_os("ENV_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".env"));
    load_env_file(&path)
}

/// Load one env file; see [`load_dotenv`].
pub fn load_env_file(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(source) => Err(AnalyticsError::EnvFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
