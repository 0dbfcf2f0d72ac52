// SPDX-License-Identifier: MIT

//! Master-process entrypoint and operator CLI.
//!
//! `station serve` is the master process composition root (spec.md §2
//! Composition): it loads `station.yaml`, wires the event emitter, the
//! subscriber registry, the batch supervisor, and the offline-queue sync
//! engine, then runs until interrupted. The remaining subcommands are
//! read-only operator conveniences over the same data the master acts
//! on — they do not talk to a running master over IPC, since the
//! HTTP/WebSocket surface that would normally front that is out of scope
//! here (spec.md §1).

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use station_core::{EventEmitter, StationConfig};
use station_daemon::{BatchSupervisor, SubscriberRegistry, SupervisorPaths, SyncEngine};
use station_loader::{DriverRegistry, PackageLoader, SequenceRegistry};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "station", about = "Station control service master process")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the master process: supervisor, sync engine, push fan-out.
    Serve {
        #[arg(long, env = "STATION_CONFIG", default_value = "station.yaml")]
        config: PathBuf,
        #[arg(long, default_value = "packages")]
        package_root: PathBuf,
        #[arg(long, default_value = "data")]
        data_root: PathBuf,
        #[arg(long, default_value = "sockets")]
        socket_root: PathBuf,
        #[arg(long, default_value = "station-worker")]
        worker_binary: PathBuf,
    },
    /// Configuration inspection.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Sequence package discovery.
    Packages {
        #[command(subcommand)]
        command: PackagesCommand,
    },
    /// Offline queue inspection.
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Parse `station.yaml` and report any schema errors.
    Validate {
        #[arg(long, env = "STATION_CONFIG", default_value = "station.yaml")]
        config: PathBuf,
    },
    /// Print the parsed configuration as JSON.
    Show {
        #[arg(long, env = "STATION_CONFIG", default_value = "station.yaml")]
        config: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum PackagesCommand {
    /// List sequence packages discovered under a package root.
    List {
        #[arg(long, default_value = "packages")]
        root: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum QueueCommand {
    /// Report pending/failed counts for one batch's offline queue.
    Status {
        #[arg(long, default_value = "data")]
        data_root: PathBuf,
        #[arg(long)]
        batch: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Command::Serve { config, package_root, data_root, socket_root, worker_binary } => {
            serve(config, package_root, data_root, socket_root, worker_binary).await
        }
        Command::Config { command: ConfigCommand::Validate { config } } => {
            StationConfig::load(&config)?;
            println!("{}: valid", config.display());
            Ok(())
        }
        Command::Config { command: ConfigCommand::Show { config } } => {
            let config = StationConfig::load(&config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Packages { command: PackagesCommand::List { root } } => {
            let loader = PackageLoader::new(root, SequenceRegistry::new(), DriverRegistry::new());
            for name in loader.discover_packages()? {
                let manifest = loader.load_package(&name)?;
                println!("{name}\t{}\t{}", manifest.version, manifest.description);
            }
            Ok(())
        }
        Command::Queue { command: QueueCommand::Status { data_root, batch } } => {
            let path = data_root.join(&batch).join(format!("{batch}-queue.jsonl"));
            let queue = station_storage::OfflineQueue::open(&path, station_storage::DEFAULT_MAX_RETRIES)?;
            println!("pending: {}", queue.count_pending());
            println!("failed: {}", queue.count_failed());
            Ok(())
        }
    }
}

async fn serve(
    config_path: PathBuf,
    package_root: PathBuf,
    data_root: PathBuf,
    socket_root: PathBuf,
    worker_binary: PathBuf,
) -> anyhow::Result<()> {
    let station_config = StationConfig::load(&config_path)?;
    std::fs::create_dir_all(&data_root)?;
    std::fs::create_dir_all(&socket_root)?;

    let emitter = Arc::new(EventEmitter::new());
    let registry = Arc::new(SubscriberRegistry::new());
    station_daemon::frames::install(&emitter, registry.clone());

    let paths = SupervisorPaths {
        worker_binary,
        config_path: config_path.clone(),
        package_root,
        data_root: data_root.clone(),
        socket_root,
    };
    let supervisor = Arc::new(BatchSupervisor::new(paths, station_config.batches.clone(), emitter.clone()));
    supervisor.start().await;
    info!(station = %station_config.station.id, "master process started");

    let sync_handle = if !station_config.backend.url.is_empty() {
        let backend_client = station_backend::BackendClient::new(station_backend::BackendClientConfig {
            base_url: station_config.backend.url.clone(),
            station_id: station_config.backend.station_id.clone(),
            equipment_id: station_config.backend.equipment_id.map(|id| id.to_string()),
            timeout_secs: station_config.backend.timeout,
        })?;
        let sync_engine = Arc::new(SyncEngine::new(backend_client, data_root));
        let batch_ids: Vec<String> = station_config.batches.iter().map(|b| b.id.clone()).collect();
        let interval = std::time::Duration::from_secs(station_config.backend.sync_interval);
        let engine = sync_engine.clone();
        Some(tokio::spawn(async move {
            engine.run(move || batch_ids.clone(), interval).await;
        }))
    } else {
        None
    };

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    supervisor.stop().await;
    if let Some(handle) = sync_handle {
        handle.abort();
    }
    Ok(())
}
