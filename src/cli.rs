use chrono::NaiveDate;
use clap::{Parser, ValueEnum};

/// Fetch profile, courses and a week of the schedule from CampusNet.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,

    /// Any date inside the week to export (YYYY-MM-DD)
    #[arg(long)]
    pub week: NaiveDate,

    /// Date the first day column is mapped to; defaults to `--week`
    #[arg(long)]
    pub pivot: Option<NaiveDate>,

    /// Emit one-off events instead of weekly recurring ones
    #[arg(long)]
    pub no_repeat: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    Pretty,
    Json,
}

/// Pretty logs for local development, JSON for release builds.
fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}
