//! Load testing binary for the ingestion server
//!
//! Drives many concurrent simulated devices and checks that the server's
//! message counter advanced by exactly the number of acknowledged readings.
//!
//! Usage:
//!   loadtest [OPTIONS] <SERVER_URL>
//!
//! Examples:
//!   loadtest http://localhost:5000                  # Default: 32 devices, 100 readings each
//!   loadtest http://localhost:5000 -c 128 -n 50     # 128 devices, 50 readings each
//!   loadtest http://localhost:5000 -a ML-KEM-768    # Server started with ML-KEM-768

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use qiot_core::KemAlgorithm;
use qiot_device::{message_for_or_default, ClientBuilder, DeviceClient};
use tokio::sync::Semaphore;

#[derive(Parser, Debug)]
#[command(name = "loadtest")]
#[command(about = "Load test the telemetry ingestion server")]
struct Args {
    /// Server URL (e.g., http://localhost:5000)
    server_url: String,

    /// Number of concurrent devices
    #[arg(short = 'c', long, default_value = "32")]
    clients: usize,

    /// Number of readings per device
    #[arg(short = 'n', long, default_value = "100")]
    messages: usize,

    /// KEM parameter set the server was started with
    #[arg(short = 'a', long, default_value = "ML-KEM-512")]
    algorithm: KemAlgorithm,

    /// Maximum concurrent requests (limits parallelism)
    #[arg(long, default_value = "64")]
    max_concurrent: usize,
}

struct Stats {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    total_latency_us: AtomicU64,
    min_latency_us: AtomicU64,
    max_latency_us: AtomicU64,
}

impl Stats {
    fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
            min_latency_us: AtomicU64::new(u64::MAX),
            max_latency_us: AtomicU64::new(0),
        }
    }

    fn record_success(&self, latency_us: u64) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.successful.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);
        self.min_latency_us.fetch_min(latency_us, Ordering::Relaxed);
        self.max_latency_us.fetch_max(latency_us, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn report(&self, duration: Duration) {
        let total = self.total.load(Ordering::Relaxed);
        let success = self.successful.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let total_latency = self.total_latency_us.load(Ordering::Relaxed);
        let min_latency = self.min_latency_us.load(Ordering::Relaxed);
        let max_latency = self.max_latency_us.load(Ordering::Relaxed);

        let avg_latency = if success > 0 { total_latency / success } else { 0 };
        let rate = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        println!("\n=== Load Test Results ===");
        println!("Duration:     {:?}", duration);
        println!("Total:        {} readings", total);
        if total > 0 {
            println!("Successful:   {} ({:.1}%)", success, (success as f64 / total as f64) * 100.0);
        }
        println!("Failed:       {}", failed);
        println!("Throughput:   {:.1} readings/sec", rate);
        println!("\nLatency (successful readings):");
        if min_latency != u64::MAX {
            println!("  Min:        {:.2} ms", min_latency as f64 / 1000.0);
            println!("  Avg:        {:.2} ms", avg_latency as f64 / 1000.0);
            println!("  Max:        {:.2} ms", max_latency as f64 / 1000.0);
        } else {
            println!("  (no successful readings)");
        }
    }
}

async fn run_device(
    device_id: usize,
    client: DeviceClient,
    public_key: Arc<Vec<u8>>,
    messages: usize,
    stats: Arc<Stats>,
    semaphore: Arc<Semaphore>,
) {
    let reading = message_for_or_default(client.device_type());

    for m in 0..messages {
        let Ok(_permit) = semaphore.acquire().await else {
            break;
        };

        let start = Instant::now();
        let result = client.send_with_key(&public_key, reading).await;
        let latency_us = start.elapsed().as_micros() as u64;

        match result {
            Ok(_) => stats.record_success(latency_us),
            Err(e) => {
                stats.record_failure();
                if m == 0 {
                    eprintln!("Device {} reading {} failed: {}", device_id, m, e);
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("Telemetry Ingestion Load Test");
    println!("=============================");
    println!("Server:          {}", args.server_url);
    println!("Devices:         {}", args.clients);
    println!("Readings/device: {}", args.messages);
    println!("Algorithm:       {}", args.algorithm);
    println!("Max concurrent:  {}", args.max_concurrent);
    println!();

    let probe = ClientBuilder::new(&args.server_url)
        .algorithm(args.algorithm)
        .build()?;
    let public_key = Arc::new(probe.fetch_public_key().await?);
    let before = probe.metrics().await?.message_count;
    println!("Public key: {} bytes, message_count before: {}", public_key.len(), before);

    let stats = Arc::new(Stats::new());
    let semaphore = Arc::new(Semaphore::new(args.max_concurrent));

    println!(
        "\nStarting load test with {} devices x {} readings = {} total...",
        args.clients,
        args.messages,
        args.clients * args.messages
    );

    let start = Instant::now();
    let mut handles = vec![];

    for device_id in 0..args.clients {
        let client = ClientBuilder::new(&args.server_url)
            .device_type(format!("sensor{}", device_id % 4 + 1))
            .algorithm(args.algorithm)
            .timeout(Duration::from_secs(60))
            .build()?;

        handles.push(tokio::spawn(run_device(
            device_id,
            client,
            public_key.clone(),
            args.messages,
            stats.clone(),
            semaphore.clone(),
        )));
    }

    futures::future::join_all(handles).await;

    let duration = start.elapsed();
    stats.report(duration);

    let after = probe.metrics().await?.message_count;
    let acknowledged = stats.successful.load(Ordering::Relaxed);
    println!("\nmessage_count after: {} (delta {})", after, after.saturating_sub(before));
    if after.saturating_sub(before) != acknowledged {
        anyhow::bail!(
            "message_count advanced by {} but {} readings were acknowledged (other traffic or lost updates)",
            after.saturating_sub(before),
            acknowledged
        );
    }

    Ok(())
}
