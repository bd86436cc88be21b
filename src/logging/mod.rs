use crate::cli::TracingFormat;
use crate::config::Config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Default filter: quiet dependencies, `level` for this crate.
///
/// The redirect chain logs every hop at trace level, so `LOG_LEVEL=trace`
/// is the switch for diagnosing portal markup changes.
fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("warn,campusnet={level}"))
}

/// Configure and initialize logging for the application.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn setup_logging(config: &Config, tracing_format: TracingFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(&config.log_level));

    match tracing_format {
        TracingFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(true)
                        .compact()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        TracingFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_events(FmtSpan::NONE)
                        .flatten_event(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}
