//! Master-side batch lifecycle (spec.md §4.E): start/stop/restart workers,
//! route commands, monitor liveness, re-emit events.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use station_core::config::BatchConfig;
use station_core::{Event, EventEmitter, EventType};
use station_wire::{Command, CommandOutcome, ManualControlArgs, StatusFlags};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::error::SupervisorError;
use crate::ipc::{WorkerHandle, WorkerSpawnConfig};

/// Paths the supervisor needs to spawn worker subprocesses. Distinct from
/// `StationConfig` because it's host layout, not station identity.
#[derive(Debug, Clone)]
pub struct SupervisorPaths {
    pub worker_binary: PathBuf,
    pub config_path: PathBuf,
    pub package_root: PathBuf,
    pub data_root: PathBuf,
    pub socket_root: PathBuf,
}

struct RunningBatch {
    handle: Arc<WorkerHandle>,
    pid: Option<u32>,
}

/// Master-side batch lifecycle manager. Holds no config source of truth of
/// its own beyond the in-memory batch map `addBatch`/`removeBatch` mutate;
/// `station.rs` is responsible for persisting config changes.
pub struct BatchSupervisor {
    paths: SupervisorPaths,
    batches: Mutex<HashMap<String, BatchConfig>>,
    running: AsyncMutex<HashMap<String, RunningBatch>>,
    emitter: Arc<EventEmitter>,
    shutdown: Arc<std::sync::atomic::AtomicBool>,
    monitor: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl BatchSupervisor {
    pub fn new(paths: SupervisorPaths, batches: Vec<BatchConfig>, emitter: Arc<EventEmitter>) -> Self {
        let batches = batches.into_iter().map(|b| (b.id.clone(), b)).collect();
        Self {
            paths,
            batches: Mutex::new(batches),
            running: AsyncMutex::new(HashMap::new()),
            emitter,
            shutdown: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            monitor: Mutex::new(None),
        }
    }

    /// Best-effort `startBatch` for every `auto_start` batch, then launch the
    /// monitor task (spec.md §4.E "start()").
    pub async fn start(self: &Arc<Self>) {
        let auto_start: Vec<String> = self
            .batches
            .lock()
            .values()
            .filter(|b| b.auto_start)
            .map(|b| b.id.clone())
            .collect();
        for id in auto_start {
            if let Err(error) = self.start_batch(&id).await {
                warn!(batch_id = %id, %error, "auto-start failed");
            }
        }

        let this = self.clone();
        let handle = tokio::spawn(async move { this.monitor_loop().await });
        *self.monitor.lock() = Some(handle);
    }

    /// Stop the monitor and every running worker (spec.md §4.E "stop()").
    pub async fn stop(&self) {
        self.shutdown.store(true, std::sync::atomic::Ordering::SeqCst);
        if let Some(handle) = self.monitor.lock().take() {
            handle.abort();
        }
        let ids: Vec<String> = self.running.lock().await.keys().cloned().collect();
        for id in ids {
            if let Err(error) = self.stop_batch(&id, Duration::from_secs(5)).await {
                warn!(batch_id = %id, %error, "stop_batch failed during shutdown");
            }
        }
    }

    async fn monitor_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            if self.shutdown.load(std::sync::atomic::Ordering::SeqCst) {
                break;
            }
            let snapshot: Vec<(String, Arc<WorkerHandle>)> =
                self.running.lock().await.iter().map(|(id, batch)| (id.clone(), batch.handle.clone())).collect();
            let mut dead = Vec::new();
            for (id, handle) in snapshot {
                match handle.try_wait().await {
                    Ok(Some(status)) => dead.push((id, status.code())),
                    Ok(None) => {}
                    Err(error) => warn!(batch_id = %id, %error, "failed to poll worker liveness"),
                }
            }
            if !dead.is_empty() {
                let mut running = self.running.lock().await;
                for (id, _) in &dead {
                    running.remove(id);
                }
            }
            for (id, exit_code) in dead {
                warn!(batch_id = %id, exit_code, "worker crashed");
                self.emit(EventType::BatchCrashed, Some(&id), serde_json::json!({ "exit_code": exit_code }));
            }
        }
    }

    fn emit(&self, event_type: EventType, batch_id: Option<&str>, data: serde_json::Value) {
        let mut event = Event::new(event_type, Utc::now());
        if let Some(batch_id) = batch_id {
            event = event.with_batch_id(station_core::BatchId::from_string(batch_id));
        }
        if let serde_json::Value::Object(map) = data {
            event = event.with_data(map);
        }
        self.emitter.emit(event);
    }

    pub fn config_for(&self, id: &str) -> Option<BatchConfig> {
        self.batches.lock().get(id).cloned()
    }

    pub fn all_configs(&self) -> Vec<BatchConfig> {
        self.batches.lock().values().cloned().collect()
    }

    pub async fn is_running(&self, id: &str) -> bool {
        self.running.lock().await.contains_key(id)
    }

    /// spec.md §4.E "startBatch(id)".
    pub async fn start_batch(&self, id: &str) -> Result<(), SupervisorError> {
        let config = self.config_for(id).ok_or_else(|| SupervisorError::UnknownBatch(station_core::BatchId::from_string(id)))?;
        let mut running = self.running.lock().await;
        if running.contains_key(id) {
            return Err(SupervisorError::AlreadyRunning(station_core::BatchId::from_string(id)));
        }

        let emitter = self.emitter.clone();
        let batch_id_tag = id.to_string();
        let spawn_config = WorkerSpawnConfig {
            worker_binary: self.paths.worker_binary.clone(),
            config_path: self.paths.config_path.clone(),
            batch_id: id.to_string(),
            package_root: self.paths.package_root.clone(),
            data_dir: self.paths.data_root.join(id),
            socket_dir: self.paths.socket_root.clone(),
        };
        let handle = WorkerHandle::spawn(spawn_config, move |event| {
            forward_worker_event(&emitter, &batch_id_tag, event);
        })
        .await?;

        let pid = handle.pid();
        running.insert(id.to_string(), RunningBatch { handle: Arc::new(handle), pid });
        drop(running);

        self.emit(EventType::BatchStarted, Some(id), serde_json::json!({ "pid": pid }));
        Ok(())
    }

    /// spec.md §4.E "stopBatch(id, timeout)".
    pub async fn stop_batch(&self, id: &str, timeout: Duration) -> Result<(), SupervisorError> {
        let mut running = self.running.lock().await;
        let batch = running.remove(id).ok_or_else(|| SupervisorError::NotRunning(station_core::BatchId::from_string(id)))?;
        drop(running);

        let shutdown_result = tokio::time::timeout(timeout, batch.handle.send_command(Command::Shutdown)).await;
        if shutdown_result.is_err() {
            warn!(batch_id = id, "graceful shutdown timed out; killing worker");
            if let Err(error) = batch.handle.kill().await {
                warn!(batch_id = id, %error, "failed to kill worker process");
            }
        }
        drop(batch);

        self.emit(EventType::BatchStopped, Some(id), serde_json::json!({}));
        Ok(())
    }

    pub async fn restart_batch(&self, id: &str, timeout: Duration) -> Result<(), SupervisorError> {
        self.stop_batch(id, timeout).await?;
        self.start_batch(id).await
    }

    /// spec.md §4.E "sendCommand(id, type, params, timeout)".
    pub async fn send_command(&self, id: &str, command: Command, timeout: Duration) -> Result<serde_json::Value, SupervisorError> {
        let running = self.running.lock().await;
        let batch = running.get(id).ok_or_else(|| SupervisorError::NotRunning(station_core::BatchId::from_string(id)))?;
        let handle = batch.handle.clone();
        drop(running);

        let response = tokio::time::timeout(timeout, handle.send_command(command))
            .await
            .map_err(|_| SupervisorError::Protocol(station_wire::ProtocolError::Timeout))??;
        match response.outcome {
            CommandOutcome::Ok { data } => Ok(data),
            CommandOutcome::Error { error } => Err(SupervisorError::WorkerError(error)),
        }
    }

    pub async fn start_sequence(&self, id: &str, parameters: serde_json::Map<String, serde_json::Value>) -> Result<serde_json::Value, SupervisorError> {
        self.send_command(id, Command::StartSequence { parameters }, Duration::from_secs(5)).await
    }

    pub async fn stop_sequence(&self, id: &str) -> Result<serde_json::Value, SupervisorError> {
        self.send_command(id, Command::StopSequence, Duration::from_secs(5)).await
    }

    pub async fn manual_control(&self, id: &str, args: ManualControlArgs) -> Result<serde_json::Value, SupervisorError> {
        self.send_command(id, Command::ManualControl(args), Duration::from_secs(30)).await
    }

    /// Merges the static batch config with live `GET_STATUS` data when the
    /// batch is running (spec.md §4.E "getBatchStatus(id)").
    pub async fn batch_status(&self, id: &str, flags: StatusFlags) -> Result<serde_json::Value, SupervisorError> {
        let config = self.config_for(id).ok_or_else(|| SupervisorError::UnknownBatch(station_core::BatchId::from_string(id)))?;
        let mut status = serde_json::json!({
            "id": config.id,
            "name": config.name,
            "sequence_package": config.sequence_package,
            "auto_start": config.auto_start,
            "running": false,
        });
        if self.is_running(id).await {
            status["running"] = serde_json::json!(true);
            match self.send_command(id, Command::GetStatus { flags }, Duration::from_secs(5)).await {
                Ok(live) => {
                    if let (Some(target), serde_json::Value::Object(live)) = (status.as_object_mut(), live) {
                        for (k, v) in live {
                            target.insert(k, v);
                        }
                    }
                }
                Err(error) => warn!(batch_id = id, %error, "get_status failed while merging batch status"),
            }
        }
        Ok(status)
    }

    pub async fn all_batch_statuses(&self, flags: StatusFlags) -> Vec<serde_json::Value> {
        let ids: Vec<String> = self.batches.lock().keys().cloned().collect();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match self.batch_status(&id, flags).await {
                Ok(status) => out.push(status),
                Err(error) => warn!(batch_id = %id, %error, "failed to collect batch status"),
            }
        }
        out
    }

    /// spec.md §4.E "addBatch(config)".
    pub fn add_batch(&self, config: BatchConfig) {
        self.batches.lock().insert(config.id.clone(), config);
    }

    /// spec.md §4.E "removeBatch(id)" — fails if currently running.
    pub async fn remove_batch(&self, id: &str) -> Result<(), SupervisorError> {
        if self.is_running(id).await {
            return Err(SupervisorError::BatchRunningConfigLocked(station_core::BatchId::from_string(id)));
        }
        self.batches.lock().remove(id);
        Ok(())
    }

    /// spec.md §4.E "getHardwareStatus(id)".
    pub async fn hardware_status(&self, id: &str) -> Result<serde_json::Value, SupervisorError> {
        let config = self.config_for(id).ok_or_else(|| SupervisorError::UnknownBatch(station_core::BatchId::from_string(id)))?;
        let mut status = serde_json::json!({});
        for hardware_id in config.hardware.keys() {
            status[hardware_id] = serde_json::json!({ "configured": true, "connected": false });
        }
        if self.is_running(id).await {
            if let Ok(live) = self.send_command(id, Command::GetStatus { flags: StatusFlags { include_hardware: true, include_statistics: false } }, Duration::from_secs(5)).await {
                if let Some(hardware) = live.get("hardware").and_then(|v| v.as_object()) {
                    for (name, connected) in hardware {
                        status[name] = serde_json::json!({ "configured": true, "connected": connected });
                    }
                }
            }
        }
        Ok(status)
    }

    /// spec.md §4.E "getAllBatchStatistics()".
    pub async fn all_batch_statistics(&self) -> HashMap<String, serde_json::Value> {
        let ids: Vec<String> = self.batches.lock().keys().cloned().collect();
        let mut out = HashMap::new();
        for id in ids {
            let stats = if self.is_running(&id).await {
                self.send_command(&id, Command::GetStatus { flags: StatusFlags { include_hardware: false, include_statistics: true } }, Duration::from_secs(5))
                    .await
                    .ok()
                    .and_then(|v| v.get("statistics").cloned())
                    .unwrap_or_else(|| serde_json::json!({ "total": 0, "pass": 0, "fail": 0, "pass_rate": 0.0 }))
            } else {
                serde_json::json!({ "total": 0, "pass": 0, "fail": 0, "pass_rate": 0.0 })
            };
            out.insert(id, stats);
        }
        out
    }
}

fn forward_worker_event(emitter: &EventEmitter, batch_id: &str, event: station_wire::WorkerEvent) {
    use station_wire::WorkerEvent as W;
    let batch_id = station_core::BatchId::from_string(batch_id);
    let (event_type, data) = match event {
        W::StepStart { step, index, total, execution_id } => (
            EventType::StepStarted,
            serde_json::json!({ "step": step, "index": index, "total": total, "execution_id": execution_id }),
        ),
        W::StepComplete { step, index, duration_secs, passed, result, execution_id } => (
            EventType::StepCompleted,
            serde_json::json!({
                "step": step, "index": index, "duration_secs": duration_secs,
                "passed": passed, "result": result, "execution_id": execution_id,
            }),
        ),
        W::SequenceComplete { execution_id, overall_pass, duration_secs, steps } => (
            EventType::SequenceCompleted,
            serde_json::json!({ "execution_id": execution_id, "overall_pass": overall_pass, "duration_secs": duration_secs, "steps": steps }),
        ),
        W::WipProcessComplete { wip_id, process_id, result, wip_status, can_convert } => (
            EventType::WipProcessComplete,
            serde_json::json!({ "wip_id": wip_id, "process_id": process_id, "result": result, "wip_status": wip_status, "can_convert": can_convert }),
        ),
        W::Log { level, message } => (EventType::Log, serde_json::json!({ "level": level, "message": message })),
        W::Error { code, message, step } => (EventType::Error, serde_json::json!({ "code": code, "message": message, "step": step })),
        W::StatusUpdate(update) => (EventType::BatchStatusChanged, serde_json::to_value(update).unwrap_or(serde_json::Value::Null)),
    };
    let mut out = Event::new(event_type, Utc::now()).with_batch_id(batch_id);
    if let serde_json::Value::Object(map) = data {
        out = out.with_data(map);
    }
    info!(batch_id = %batch_id, event_type = ?out.event_type, "forwarding worker event");
    emitter.emit(out);
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
