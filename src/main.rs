//! Spool Uploadr - drains a local folder into a cloud disk
//!
//! Runs until it receives SIGHUP, SIGINT, SIGTERM or SIGQUIT.

use clap::Parser;
use spool_uploadr::config::Config;
use spool_uploadr::lifecycle::{self, log_shutdown, wait_for_signal};
use spool_uploadr::logging::{init_logging, LogOptions};
use spool_uploadr::metrics::memory::MemorySampler;
use spool_uploadr::metrics::server::MetricsServer;
use spool_uploadr::uploader::Startup;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};

/// Spool Uploadr - directory-draining uploader with quota guard
#[derive(Parser, Debug)]
#[command(name = "spool-uploadr")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: executable path with .yaml extension)
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write JSON lines to stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let started = Instant::now();
    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => lifecycle::default_config_path()?,
    };
    println!("config-file: {}", config_path.display());

    let config = Config::load(&config_path)?;
    println!("config: {}", config.summary());

    let app_name = lifecycle::app_name();
    let log_path = init_logging(
        &config.log_dir,
        &app_name,
        &LogOptions {
            default_level: args.log_level,
            json: args.json,
        },
    )?;

    info!("application startup [{}]", app_name);
    info!(log_file = %log_path.display(), "conf: {}", config.summary());

    let result = run(config).await;
    if let Err(e) = &result {
        error!(error = %e, "fatal error");
    }
    log_shutdown(started);
    result
}

async fn run(config: Config) -> anyhow::Result<()> {
    let timings = config.timing.timings();
    tokio::spawn(MemorySampler::new().run(timings.memory_sample));

    let uploader = match Startup::from_config(&config)? {
        Startup::Unauthenticated { authorize_url } => {
            info!(
                "Go to the following link in your browser for get token:\n{}\nput retrieved token to config and restart app",
                authorize_url
            );
            return Ok(());
        }
        Startup::Ready(uploader) => uploader,
    };

    let mut metrics_server = if config.metrics.enabled {
        let mut server = MetricsServer::new(config.metrics.address(), uploader.subscribe());
        server.start().await?;
        Some(server)
    } else {
        None
    };

    let mut control_loop = tokio::spawn(uploader.run());

    let outcome = tokio::select! {
        signal = wait_for_signal() => match signal {
            Ok(name) => {
                info!("got signal: {}", name);
                control_loop.abort();
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("failed to listen for signals")),
        },
        joined = &mut control_loop => match joined {
            Ok(Ok(never)) => match never {},
            Ok(Err(e)) => Err(anyhow::Error::new(e).context("upload loop stopped")),
            Err(e) => Err(anyhow::anyhow!("upload loop crashed: {}", e)),
        },
    };

    if let Some(server) = metrics_server.as_mut() {
        server.shutdown().await;
    }
    outcome
}
