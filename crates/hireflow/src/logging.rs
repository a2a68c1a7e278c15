//! Process-wide log output.
//!
//! The crate logs lifecycle messages through `log` and wraps item processing
//! in `tracing` spans. [`init`] installs one `tracing-subscriber` pipeline for
//! both: `log` records are bridged with `tracing_log::LogTracer`.

use std::str::FromStr;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output encoding of the console layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    /// JSON lines including the active span list.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "compact" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Builds the filter from `RUST_LOG`, falling back to `default_level`.
pub fn build_env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Installs text logging at `info` unless `RUST_LOG` says otherwise.
pub fn init() -> bool {
    init_with("info", LogFormat::Text)
}

/// Installs the global subscriber. Returns false when one was already set,
/// e.g. by the host application or an earlier test.
pub fn init_with(default_level: &str, format: LogFormat) -> bool {
    let layer = match format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_span_list(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter(default_level))
        .with(layer);

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }

    // Bridge `log` records; ok() in case the host installed a logger
    tracing_log::LogTracer::init().ok();

    tracing::debug!("Logging initialized: level={}, format={:?}", default_level, format);
    true
}
