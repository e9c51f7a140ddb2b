// ABOUTME: tracing subscriber setup for the slackbot binary
// ABOUTME: Console output in pretty or JSON form, plus an optional daily rolling JSON file

use anyhow::{Context, Result};
use slackbot_core::config::{LogFormat, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

const LOG_FILE_PREFIX: &str = "slackbot.log";

/// Default filter when `RUST_LOG` is unset
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug,hyper=info,rustls=info"
    } else {
        "info"
    }
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the process when file
/// logging is on, or buffered lines are lost on exit.
pub fn init(config: &LoggingConfig, debug: bool) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    layers.push(match config.format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Pretty => fmt::layer().boxed(),
    });

    let mut guard = None;
    if config.to_file {
        let dir = config.log_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

        let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
