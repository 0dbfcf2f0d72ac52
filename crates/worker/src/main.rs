// SPDX-License-Identifier: MIT

//! Batch worker subprocess entrypoint (spec.md §4.D).
//!
//! Launched by the batch supervisor with a command socket, an event socket,
//! the station config path, and the id of the batch it serves. Registers
//! the driver implementations this binary ships with (`station-adapters`'s
//! mock/TCP/serial drivers), loads its sequence package, and serves
//! commands until `SHUTDOWN` or the command connection closes.
//!
//! A station that ships its own sequence code builds its own worker binary
//! from this crate's library surface and registers its sequence factories
//! into a [`SequenceRegistry`] before calling [`station_worker::bootstrap`];
//! none are registered here since this crate carries no customer sequence
//! code.

use std::path::PathBuf;

use clap::Parser;
use station_adapters::{MockDriver, SerialDriver, SerialDriverConfig, TcpDriver, TcpDriverConfig};
use station_core::{DriverError, StationConfig};
use station_loader::{DriverRegistry, PackageLoader, SequenceRegistry};
use station_wire::{read_timed, write_timed, CommandRequest, WorkerEvent, DEFAULT_TIMEOUT};
use station_worker::{bootstrap, BootstrapOptions};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "station-worker", about = "Station control service batch worker subprocess")]
struct Args {
    /// Path to the station's `station.yaml`.
    #[arg(long)]
    config: PathBuf,
    /// Id of this worker's batch, as declared in `station.yaml`'s `batches` list.
    #[arg(long)]
    batch_id: String,
    /// Unix socket the supervisor listens on for commands addressed to this worker.
    #[arg(long)]
    command_socket: PathBuf,
    /// Unix socket the supervisor listens on for this worker's events.
    #[arg(long)]
    event_socket: PathBuf,
    /// Root directory containing sequence packages.
    #[arg(long)]
    package_root: PathBuf,
    /// Directory for this worker's offline queue and execution log.
    #[arg(long)]
    data_dir: PathBuf,
}

fn register_builtin_drivers(registry: &DriverRegistry, simulation: station_core::SimulationConfig, process_id: Option<u32>) {
    registry.register(
        "mock",
        "MockDriver",
        std::sync::Arc::new(move |_config: serde_json::Value| {
            Ok(std::sync::Arc::new(MockDriver::new("mock", simulation.clone(), process_id))
                as station_core::DriverHandle)
        }),
    );
    registry.register(
        "tcp",
        "TcpDriver",
        std::sync::Arc::new(|config: serde_json::Value| {
            let config: TcpDriverConfig = serde_json::from_value(config)
                .map_err(|e| DriverError::Connection { driver: "tcp".to_string(), message: e.to_string() })?;
            Ok(std::sync::Arc::new(TcpDriver::new("tcp", config)) as station_core::DriverHandle)
        }),
    );
    registry.register(
        "serial",
        "SerialDriver",
        std::sync::Arc::new(|config: serde_json::Value| {
            let config: SerialDriverConfig = serde_json::from_value(config)
                .map_err(|e| DriverError::Connection { driver: "serial".to_string(), message: e.to_string() })?;
            Ok(std::sync::Arc::new(SerialDriver::new("serial", config)) as station_core::DriverHandle)
        }),
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let station_config = StationConfig::load(&args.config)?;
    let batch = station_config
        .batches
        .iter()
        .find(|b| b.id == args.batch_id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("batch '{}' not found in {}", args.batch_id, args.config.display()))?;

    let sequences = SequenceRegistry::new();
    let drivers = DriverRegistry::new();
    register_builtin_drivers(&drivers, station_config.simulation.clone(), batch.process_id);
    let loader = PackageLoader::new(args.package_root.clone(), sequences, drivers);
    loader.discover_packages()?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<WorkerEvent>();

    let backend_config = if station_config.backend.url.is_empty() {
        None
    } else {
        Some(station_backend::BackendClientConfig {
            base_url: station_config.backend.url.clone(),
            station_id: station_config.backend.station_id.clone(),
            equipment_id: station_config.backend.equipment_id.map(|id| id.to_string()),
            timeout_secs: station_config.backend.timeout,
        })
    };

    let queue_path = args.data_dir.join(format!("{}-queue.jsonl", args.batch_id));
    let log_path = args.data_dir.join(format!("{}-executions.jsonl", args.batch_id));
    std::fs::create_dir_all(&args.data_dir)?;

    let worker = bootstrap(
        &loader,
        BootstrapOptions {
            batch: &batch,
            backend_config,
            queue_path: Some(&queue_path),
            execution_log_path: Some(&log_path),
        },
        events_tx,
    )
    .await?;

    if worker.is_offline() {
        warn!(batch_id = %args.batch_id, "worker starting in offline mode");
    }

    let mut command_stream = UnixStream::connect(&args.command_socket).await?;
    let mut event_stream = UnixStream::connect(&args.event_socket).await?;

    let event_forwarder = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if let Err(error) = write_timed(&mut event_stream, &event, DEFAULT_TIMEOUT).await {
                error!(%error, "failed to forward worker event; event stream likely closed");
                break;
            }
        }
    });

    info!(batch_id = %args.batch_id, "worker ready");
    loop {
        let request: CommandRequest = match read_timed(&mut command_stream, DEFAULT_TIMEOUT).await {
            Ok(request) => request,
            Err(station_wire::ProtocolError::ConnectionClosed) => {
                info!("command socket closed; shutting down");
                break;
            }
            // DEFAULT_TIMEOUT here only bounds how long one read call waits;
            // idling with no command traffic (the normal case between WIP
            // scans) is not a shutdown reason.
            Err(station_wire::ProtocolError::Timeout) => continue,
            Err(error) => {
                error!(%error, "error reading command; shutting down");
                break;
            }
        };

        let response = worker.handle(request).await;
        let shutting_down = worker.is_shutdown_requested();
        if let Err(error) = write_timed(&mut command_stream, &response, DEFAULT_TIMEOUT).await {
            error!(%error, "failed to write command response; shutting down");
            break;
        }
        if shutting_down {
            break;
        }
    }

    worker.cleanup().await;
    event_forwarder.abort();
    Ok(())
}
