//! Poll a fleet of devices once and print the cycle report.
//!
//! Devices come from a JSON inventory; readings are appended to a JSON
//! lines file. Extra device families can be supplied as a JSON catalog on
//! top of the built-in `tejas` family.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example poll_fleet -- --inventory inventory.json --out readings.jsonl
//! ```
//!
//! Inventory format:
//!
//! ```json
//! {"devices": [{
//!     "id": "r1", "hostname": "core-1", "address": "10.0.0.1", "family": "tejas",
//!     "credential": {"username": "admin", "password": "secret"},
//!     "interfaces": [{"interface": "hu0/1", "label": "uplink"}]
//! }]}
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ferrispoll::{FamilyRegistry, FleetPoller, JsonLinesSink, PollerConfig, config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let inventory = config::load_inventory(&args.inventory)?;
    let catalog = match &args.catalog {
        Some(path) => config::load_catalog(path)?,
        None => FamilyRegistry::with_builtin()?,
    };
    let sink = Arc::new(JsonLinesSink::open(&args.out).await?);

    let config = PollerConfig::builder()
        .concurrency(args.concurrency)
        .timeout(Duration::from_secs(args.timeout))
        .device_deadline(Duration::from_secs(args.deadline))
        .build();

    let poller = FleetPoller::over_ssh(catalog, sink, config);

    // Ctrl-C stops the cycle; devices still running are dropped from the report
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let report = poller.poll_until(&inventory, shutdown).await?;

    println!("{}", serde_json::to_string_pretty(&report.to_document())?);
    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    inventory: PathBuf,
    catalog: Option<PathBuf>,
    out: PathBuf,
    concurrency: usize,
    timeout: u64,
    deadline: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            inventory: PathBuf::from("inventory.json"),
            catalog: None,
            out: PathBuf::from("readings.jsonl"),
            concurrency: 5,
            timeout: 10,
            deadline: 120,
        };

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match (args[i].as_str(), value) {
                ("--inventory" | "-i", Some(v)) => parsed.inventory = PathBuf::from(v),
                ("--catalog" | "-c", Some(v)) => parsed.catalog = Some(PathBuf::from(v)),
                ("--out" | "-o", Some(v)) => parsed.out = PathBuf::from(v),
                ("--concurrency" | "-n", Some(v)) => parsed.concurrency = v.parse().unwrap_or(5),
                ("--timeout" | "-t", Some(v)) => parsed.timeout = v.parse().unwrap_or(10),
                ("--deadline" | "-d", Some(v)) => parsed.deadline = v.parse().unwrap_or(120),
                ("--help", _) => {
                    Self::print_help();
                    std::process::exit(0);
                }
                (other, _) => {
                    eprintln!("Unknown or incomplete argument: {}", other);
                    i += 1;
                    continue;
                }
            }
            i += 2;
        }

        parsed
    }

    fn print_help() {
        println!(
            r#"ferrispoll poll_fleet example

USAGE:
    cargo run --example poll_fleet -- [OPTIONS]

OPTIONS:
    -i, --inventory <PATH>     Inventory JSON [default: inventory.json]
    -c, --catalog <PATH>       Extra device families JSON
    -o, --out <PATH>           Readings output (JSON lines) [default: readings.jsonl]
    -n, --concurrency <N>      Devices polled at once [default: 5]
    -t, --timeout <SECS>       Connect timeout [default: 10]
    -d, --deadline <SECS>      Per-device deadline [default: 120]
    --help                     Print this help message
"#
        );
    }
}
