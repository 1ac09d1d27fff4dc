//! qiot-device binary: send masked telemetry readings to a server

use std::time::Duration;

use clap::Parser;
use qiot_core::KemAlgorithm;
use qiot_device::{message_for_or_default, ClientBuilder};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "qiot-device")]
#[command(about = "Simulated IoT device sending ML-KEM protected telemetry")]
struct Args {
    /// Server URL
    #[arg(default_value = "http://127.0.0.1:5000")]
    server_url: String,

    /// Device type label (sensor1..sensor4 have canned readings)
    #[arg(short = 'd', long, default_value = "sensor1")]
    device_type: String,

    /// Reading to send instead of the device's canned one
    #[arg(short = 'm', long)]
    message: Option<String>,

    /// Number of readings to send, each with a fresh encapsulation
    #[arg(short = 'n', long, default_value = "1")]
    count: usize,

    /// KEM parameter set, must match the server
    #[arg(short = 'a', long, default_value = "ML-KEM-512")]
    algorithm: KemAlgorithm,

    /// Request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,

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

    let client = ClientBuilder::new(&args.server_url)
        .device_type(&args.device_type)
        .algorithm(args.algorithm)
        .timeout(Duration::from_secs(args.timeout))
        .build()?;

    let message = match &args.message {
        Some(m) => m.as_str(),
        None => message_for_or_default(&args.device_type),
    };

    let public_key = client.fetch_public_key().await?;
    tracing::info!(
        algorithm = %args.algorithm,
        bytes = public_key.len(),
        "Received server public key"
    );

    let mut failures = 0usize;
    for i in 0..args.count {
        match client.send_with_key(&public_key, message).await {
            Ok(decrypted) => {
                tracing::info!(seq = i + 1, decrypted = %decrypted, "Server acknowledged reading");
            }
            Err(e) => {
                failures += 1;
                tracing::error!(seq = i + 1, error = %e, "Send failed");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} readings failed", failures, args.count);
    }

    Ok(())
}
