//! File logging.
//!
//! stdout belongs to the rendered view, so every `tracing` event goes to
//! `<data-dir>/logs/client.log` instead. `TASKWIRE_LOG_FORMAT` picks `json`
//! (default) or `pretty`; `TASKWIRE_LOG_FILTER`, then `RUST_LOG`, set the filter.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::paths::DataDir;

const FILTER_ENV: &str = "TASKWIRE_LOG_FILTER";
const FORMAT_ENV: &str = "TASKWIRE_LOG_FORMAT";
const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn,tungstenite=warn";
const LOG_FILE: &str = "client.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Anything but `pretty` means JSON.
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if value.trim().eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Flushes buffered log lines when dropped; hold it for the life of `main`.
#[must_use]
pub struct LoggingHandle {
    _guard: WorkerGuard,
}

fn filter_directives() -> String {
    [FILTER_ENV, "RUST_LOG"]
        .into_iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| EnvFilter::try_new(value).is_ok())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

pub fn init_logging(data_dir: &DataDir) -> anyhow::Result<LoggingHandle> {
    let log_dir = data_dir.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let directives = filter_directives();
    let format = LogFormat::parse(std::env::var(FORMAT_ENV).ok().as_deref());
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&log_dir, LOG_FILE));

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true);
    let registry = tracing_subscriber::registry().with(EnvFilter::try_new(&directives)?);
    match format {
        LogFormat::Pretty => registry.with(layer.pretty()).try_init()?,
        LogFormat::Json => registry
            .with(layer.json().flatten_event(true).with_current_span(true))
            .try_init()?,
    }

    tracing::info!(
        component = "logging",
        event = "logging.initialized",
        pid = std::process::id(),
        version = env!("CARGO_PKG_VERSION"),
        log_path = %log_dir.join(LOG_FILE).display(),
        format = ?format,
        filter = %directives,
    );

    Ok(LoggingHandle { _guard: guard })
}
