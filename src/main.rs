// ABOUTME: Entry point for the slackbot binary
// ABOUTME: Loads config and token, starts the dispatcher and runs it until shutdown

use anyhow::{Context, Result};
use clap::Parser;
use slackbot::{
    commands, logging, Config, Connector, Dispatcher, SlackTransportFactory,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "slackbot", version, about = "Slack bot answering simple chat commands")]
struct Cli {
    /// Path to the file holding the bot token
    #[arg(long)]
    tpath: Option<String>,

    /// Verbose logging and transport event tracing
    #[arg(long)]
    debug: bool,

    /// Config file (defaults to SLACKBOT_CONFIG_PATH, ./config.toml, then the XDG config dir)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Log panics before they take the process down
    std::panic::set_hook(Box::new(|panic_info| {
        tracing::error!(panic = %panic_info, "Panic");
        eprintln!("slackbot panicked: {}", panic_info);
        eprintln!("{}", std::backtrace::Backtrace::force_capture());
    }));

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("slackbot: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match logging::init(&config.logging, config.slack.debug) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("slackbot: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "slackbot exiting");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(tpath) = &cli.tpath {
        config.slack.token_path = tpath.clone();
    }
    if cli.debug {
        config.slack.debug = true;
    }
    config.validate()?;
    Ok(config)
}

async fn run(config: Config) -> Result<()> {
    tracing::info!(
        token_path = %config.slack.token_path,
        debug = config.slack.debug,
        refresh_secs = config.names.refresh_interval_secs,
        timezone = %config.commands.timezone,
        "Configuration loaded"
    );

    let token = slackbot::config::read_token(&config.slack.token_path)?;

    if let Some(listen) = &config.metrics.listen {
        start_metrics_exporter(listen)?;
    }

    let registry = commands::default_registry(&config.commands)?;
    let factory = Arc::new(SlackTransportFactory::new(config.slack.app_token.clone()));
    let connector = Connector::with_refresh_interval(factory, config.names.refresh_interval());
    let mut dispatcher = Dispatcher::new(connector.clone(), registry)?;

    dispatcher
        .start(config.slack.debug, &token)
        .await
        .context("error starting bot")?;

    spawn_shutdown_handler(connector);

    let result = dispatcher.run().await.context("error running bot");

    if let Err(e) = dispatcher.stop().await {
        tracing::warn!(error = %e, "Error stopping bot");
    }
    result
}

fn start_metrics_exporter(listen: &str) -> Result<()> {
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("Invalid metrics listen address: {}", listen))?;

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Stop the connector on Ctrl-C or SIGTERM; the run loop then ends cleanly
fn spawn_shutdown_handler(connector: Connector) {
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        if let Err(e) = connector.stop().await {
            tracing::warn!(error = %e, "Failed to stop connector");
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
