//! Capgate Daemon - Main entry point
//!
//! Builds the capability registry from the configured board and serves the
//! generated routes over HTTP.

mod board;
mod config;
mod server;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "capgate")]
#[command(about = "HTTP gateway for descriptor-defined actuators and sensors")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "capgate.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print the discovery manifest and exit
    #[arg(long)]
    print_manifest: bool,

    /// Write a sample configuration to the config path and exit
    #[arg(long)]
    write_default_config: bool,
}

// Single-threaded on purpose: every request runs to completion before the
// next one is accepted.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Capgate v{}", env!("CARGO_PKG_VERSION"));

    if args.write_default_config {
        config::save_default_config(&args.config)?;
        return Ok(());
    }

    // Load configuration
    let mut config = config::load_config(&args.config)?;

    // Override bind address if specified
    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }

    info!(
        outputs = config.outputs.len(),
        sensors = config.sensors.len(),
        format = ?config.manifest.format,
        "Configuration loaded"
    );

    let gateway = board::gateway_from_config(&config)?;

    if args.print_manifest {
        println!("{}", gateway.manifest_document());
        return Ok(());
    }

    for route in gateway.routes() {
        info!(path = %route.path, methods = ?route.methods, "Route available");
    }

    server::run(Arc::new(gateway), &config.daemon.bind).await?;

    Ok(())
}
