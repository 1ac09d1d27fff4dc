//! qiot-server binary: post-quantum telemetry ingestion server

use std::path::PathBuf;

use clap::Parser;
use qiot_core::{KemAlgorithm, ServerConfig};
use qiot_server::ServerBuilder;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "qiot-server")]
#[command(about = "Ingest ML-KEM protected telemetry from IoT devices")]
struct Args {
    /// JSON config file (defaults apply when omitted)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Listen port, overrides the config file
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// KEM parameter set (ML-KEM-512, ML-KEM-768, ML-KEM-1024)
    #[arg(short = 'a', long)]
    algorithm: Option<KemAlgorithm>,

    /// Mount the experimental /rekey endpoint
    #[arg(long)]
    experimental_rekey: bool,

    /// Disable the Prometheus exporter at /metrics
    #[arg(long)]
    no_prometheus: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default().with_prometheus(true),
    };
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(algorithm) = args.algorithm {
        config = config.with_algorithm(algorithm);
    }
    if args.experimental_rekey {
        config = config.with_experimental_rekey(true);
    }
    if args.no_prometheus {
        config = config.with_prometheus(false);
    }

    let server = ServerBuilder::new(config).build()?;

    tracing::info!(addr = %server.addr(), "Quantum-resistant IoT server ready");
    server.run().await?;

    Ok(())
}
