//! The batch worker itself (spec.md §4.D): owns one sequence instance's
//! hardware, runs `START_SEQUENCE`/`STOP_SEQUENCE`/`GET_STATUS`/
//! `MANUAL_CONTROL`/`SHUTDOWN`/`PING`, and drives the completion path that
//! reports a finished execution back to the backend.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use station_backend::{
    BackendClient, BackendClientConfig, BackendError, CompleteProcessRequest, StartProcessRequest,
};
use station_core::config::BatchConfig;
use station_core::{DriverHandle, ExecutionId, ExecutionResult, HardwareMap, ParameterMap, SequenceFactory};
use station_loader::PackageLoader;
use station_storage::{ExecutionLog, OfflineQueue, DEFAULT_MAX_RETRIES};
use station_wire::{
    Command, CommandOutcome, CommandRequest, CommandResponse, ManualControlArgs, StatusFlags, StatusUpdate,
    WorkerEvent,
};

use crate::callbacks;
use crate::error::WorkerError;
use crate::state::{RunState, StepListEntry, WipContext, WorkerStatus};

/// Upper bound on how long `STOP_SEQUENCE`/`SHUTDOWN` wait for a cooperative
/// stop to finish cleanup and the completion path before giving up and
/// hard-aborting the task (spec.md §5: cleanup always runs, but a stuck
/// driver call must not wedge the command loop forever).
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(30);

struct Inner {
    sequence_factory: SequenceFactory,
    hardware: HardwareMap,
    backend: Option<BackendClient>,
    offline_queue: Option<Mutex<OfflineQueue>>,
    execution_log: Option<ExecutionLog>,
    state: Arc<Mutex<RunState>>,
    events: UnboundedSender<WorkerEvent>,
    offline: AtomicBool,
    shutdown_requested: AtomicBool,
}

/// A running batch worker. Cheap to clone — every clone shares the same
/// sequence factory, hardware map, and run state.
#[derive(Clone)]
pub struct Worker {
    inner: Arc<Inner>,
}

/// Everything [`bootstrap`] needs beyond the manifest/registry plumbing
/// already owned by a [`PackageLoader`].
pub struct BootstrapOptions<'a> {
    pub batch: &'a BatchConfig,
    pub backend_config: Option<BackendClientConfig>,
    pub queue_path: Option<&'a Path>,
    pub execution_log_path: Option<&'a Path>,
}

/// Run the worker startup sequence (spec.md §4.D "Startup"): load the
/// sequence package, construct and connect its drivers, initialize the
/// backend client and run its health check, open the offline queue.
///
/// Drivers that fail to construct or connect are logged and simply absent
/// from the resulting hardware map — a broken instrument must not prevent
/// the rest of the batch from starting.
pub async fn bootstrap(
    loader: &PackageLoader,
    options: BootstrapOptions<'_>,
    events: UnboundedSender<WorkerEvent>,
) -> Result<Worker, WorkerError> {
    let manifest = loader.load_package(&options.batch.sequence_package)?;
    let sequence_factory = loader.load_sequence_class(&manifest)?;
    let driver_factories = loader.load_hardware_drivers(&manifest);

    let mut hardware: HardwareMap = HashMap::new();
    for (hardware_id, factory) in driver_factories {
        let config = options
            .batch
            .hardware
            .get(&hardware_id)
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        let driver: DriverHandle = match factory(config) {
            Ok(driver) => driver,
            Err(error) => {
                warn!(hardware_id, %error, "driver failed to construct; omitting from hardware map");
                continue;
            }
        };
        if let Err(error) = driver.connect().await {
            warn!(hardware_id, %error, "driver failed to connect; omitting from hardware map");
            continue;
        }
        hardware.insert(hardware_id, driver);
    }

    let backend = options.backend_config.map(BackendClient::new).transpose()?;
    let offline = AtomicBool::new(false);
    if let Some(client) = &backend {
        if !client.health().await {
            warn!("backend health check failed at startup; worker starting offline");
            offline.store(true, Ordering::SeqCst);
        }
    }

    let offline_queue = options
        .queue_path
        .map(|path| OfflineQueue::open(path, DEFAULT_MAX_RETRIES))
        .transpose()?
        .map(Mutex::new);
    let execution_log = options.execution_log_path.map(ExecutionLog::new);

    Ok(Worker {
        inner: Arc::new(Inner {
            sequence_factory,
            hardware,
            backend,
            offline_queue,
            execution_log,
            state: Arc::new(Mutex::new(RunState::default())),
            events,
            offline,
            shutdown_requested: AtomicBool::new(false),
        }),
    })
}

enum StartOutcome {
    Proceed(Option<WipContext>),
    WipNotFound,
    Abort(String),
}

impl Worker {
    pub fn is_offline(&self) -> bool {
        self.inner.offline.load(Ordering::SeqCst)
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.inner.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Handle one [`CommandRequest`], always producing a response that
    /// echoes its request id (spec.md §4.D: "all commands must produce a
    /// response referencing the request id").
    pub async fn handle(&self, request: CommandRequest) -> CommandResponse {
        let request_id = request.request_id;
        match request.command {
            Command::StartSequence { parameters } => self.start_sequence(request_id, parameters).await,
            Command::StopSequence => self.stop_sequence(request_id).await,
            Command::GetStatus { flags } => self.get_status(request_id, flags),
            Command::ManualControl(args) => self.manual_control(request_id, args).await,
            Command::Shutdown => self.shutdown(request_id).await,
            Command::Ping => CommandResponse::ok(request_id, serde_json::json!({ "pong": true })),
        }
    }

    async fn start_sequence(
        &self,
        request_id: String,
        parameters: serde_json::Map<String, serde_json::Value>,
    ) -> CommandResponse {
        {
            let state = self.inner.state.lock();
            if state.status == WorkerStatus::Running {
                return CommandResponse::error(request_id, WorkerError::AlreadyRunning.to_string());
            }
        }

        let params: ParameterMap = parameters.into_iter().collect();
        let execution_id = ExecutionId::new();

        let wip_context = match self.resolve_wip_context(&params).await {
            StartOutcome::Proceed(ctx) => ctx,
            StartOutcome::WipNotFound => return CommandResponse::error(request_id, "wip not found".to_string()),
            StartOutcome::Abort(message) => return CommandResponse::error(request_id, message),
        };

        let sequence = (self.inner.sequence_factory)(self.inner.hardware.clone(), params.clone());
        let total_steps = sequence.steps().len();

        let callbacks = callbacks::build(self.inner.state.clone(), self.inner.events.clone(), execution_id, total_steps);
        let mut executor = station_executor::SequenceExecutor::new(sequence, params).with_callbacks(callbacks);
        let stop_token = executor.stop_token();

        {
            let mut state = self.inner.state.lock();
            state.begin_run(execution_id, Utc::now(), total_steps, stop_token);
            state.wip_context = wip_context;
        }

        let _ = self.inner.events.send(WorkerEvent::StatusUpdate(StatusUpdate {
            status: "running".to_string(),
            current_step: None,
            step_index: 0,
            total_steps,
            progress: 0.0,
            execution_id: Some(execution_id),
        }));

        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let result = executor.run().await;
            complete(inner, execution_id, result).await;
        });
        self.inner.state.lock().set_task(task);

        CommandResponse::ok(request_id, serde_json::json!({ "execution_id": execution_id.short_code() }))
    }

    async fn resolve_wip_context(&self, params: &ParameterMap) -> StartOutcome {
        let (Some(wip_id), Some(process_id), Some(operator_id)) = (
            params.get("wip_id").and_then(|v| v.as_str()).map(str::to_string),
            params.get("process_id").and_then(|v| v.as_u64()).map(|v| v as u32),
            params.get("operator_id").and_then(|v| v.as_str()).map(str::to_string),
        ) else {
            return StartOutcome::Proceed(None);
        };
        let equipment_id = params.get("equipment_id").and_then(|v| v.as_str()).map(str::to_string);

        let Some(backend) = &self.inner.backend else {
            return StartOutcome::Proceed(Some(WipContext {
                wip_id,
                wip_int_id: 0,
                process_id,
                operator_id,
                equipment_id,
            }));
        };

        let wip_int_id = match backend.scan(&wip_id, Some(process_id)).await {
            Ok(info) => info.id,
            Err(BackendError::WipNotFound) => return StartOutcome::WipNotFound,
            Err(error) => {
                warn!(%error, "backend lookup failed; marking worker offline");
                self.inner.offline.store(true, Ordering::SeqCst);
                return StartOutcome::Proceed(Some(WipContext {
                    wip_id,
                    wip_int_id: 0,
                    process_id,
                    operator_id,
                    equipment_id,
                }));
            }
        };

        let started_at = Utc::now();
        let request = StartProcessRequest {
            process_id,
            operator_id: operator_id.clone(),
            equipment_id: equipment_id.clone(),
            started_at,
        };
        if let Err(error) = backend.start_process(wip_int_id, &request).await {
            if error.is_transient() {
                warn!(%error, "start-process failed (transient); queuing offline");
                self.inner.enqueue_offline(
                    "start_process",
                    serde_json::json!({
                        "wip_int_id": wip_int_id,
                        "request": {
                            "process_id": request.process_id,
                            "operator_id": request.operator_id,
                            "equipment_id": request.equipment_id,
                            "started_at": request.started_at,
                        },
                    }),
                );
            } else {
                return StartOutcome::Abort(error.to_string());
            }
        }

        StartOutcome::Proceed(Some(WipContext { wip_id, wip_int_id, process_id, operator_id, equipment_id }))
    }

    async fn stop_sequence(&self, request_id: String) -> CommandResponse {
        {
            let state = self.inner.state.lock();
            if state.status != WorkerStatus::Running {
                return CommandResponse::error(request_id, WorkerError::NotRunning.to_string());
            }
        }
        self.wait_for_stop().await;
        CommandResponse::ok(request_id, serde_json::json!({}))
    }

    /// Signal a cooperative stop and wait for the running task to finish on
    /// its own — cleanup and the completion path (spec.md §4.D) only run if
    /// that `executor.run().await; complete(...).await;` future is allowed to
    /// resume, not dropped via `JoinHandle::abort`. Only hard-aborts if the
    /// task hasn't finished within `STOP_GRACE_PERIOD`, as a last resort.
    async fn wait_for_stop(&self) {
        let task = {
            let mut state = self.inner.state.lock();
            state.request_stop();
            state.take_task()
        };
        let Some(mut task) = task else {
            return;
        };
        let abort_handle = task.abort_handle();
        if tokio::time::timeout(STOP_GRACE_PERIOD, &mut task).await.is_err() {
            tracing::error!("cooperative stop did not finish within the grace period; aborting task");
            abort_handle.abort();
            let _ = task.await;
        }
    }

    fn get_status(&self, request_id: String, flags: StatusFlags) -> CommandResponse {
        let state = self.inner.state.lock();
        let (execution_id, steps, passed) = match (&state.last_run, state.status) {
            (Some(last), WorkerStatus::Idle) => (
                Some(last.execution_id),
                last.steps.clone(),
                Some(last.passed),
            ),
            _ => (state.execution_id, state.steps.clone(), state.last_run.as_ref().map(|r| r.passed)),
        };

        let mut data = serde_json::json!({
            "status": if state.status == WorkerStatus::Running { "running" } else { "idle" },
            "current_step": steps.last().map(|s| s.name.clone()),
            "step_index": state.started_count,
            "total_steps": state.total_steps,
            "progress": state.progress(),
            "started_at": state.started_at,
            "execution_id": execution_id,
            "steps": steps,
            "last_run_passed": passed,
        });

        if flags.include_hardware {
            let hardware: serde_json::Map<String, serde_json::Value> = self
                .inner
                .hardware
                .iter()
                .map(|(name, driver)| (name.clone(), serde_json::json!(driver.is_connected())))
                .collect();
            data["hardware"] = serde_json::Value::Object(hardware);
        }
        if flags.include_statistics {
            data["statistics"] = serde_json::json!({
                "total": state.stats.total,
                "pass": state.stats.pass,
                "fail": state.stats.fail,
                "pass_rate": state.stats.pass_rate(),
            });
        }

        CommandResponse::ok(request_id, data)
    }

    async fn manual_control(&self, request_id: String, args: ManualControlArgs) -> CommandResponse {
        {
            let state = self.inner.state.lock();
            if state.status == WorkerStatus::Running {
                return CommandResponse::error(request_id, "cannot use manual control while a sequence is running".to_string());
            }
        }
        let Some(driver) = self.inner.hardware.get(&args.hardware).cloned() else {
            return CommandResponse::error(request_id, WorkerError::UnknownHardware(args.hardware).to_string());
        };
        match driver.call(&args.method, serde_json::Value::Object(args.params)).await {
            Ok(result) => CommandResponse::ok(request_id, serde_json::json!({ "result": result })),
            Err(error) => CommandResponse::error(request_id, error.to_string()),
        }
    }

    async fn shutdown(&self, request_id: String) -> CommandResponse {
        let running = self.inner.state.lock().status == WorkerStatus::Running;
        if running {
            self.wait_for_stop().await;
        }
        self.inner.shutdown_requested.store(true, Ordering::SeqCst);
        CommandResponse::ok(request_id, serde_json::json!({}))
    }

    /// Best-effort teardown (spec.md §4.D "Cleanup on worker shutdown"):
    /// disconnect every driver, logging failures rather than propagating
    /// them — one stuck instrument must not block process exit.
    pub async fn cleanup(&self) {
        for (name, driver) in &self.inner.hardware {
            if let Err(error) = driver.disconnect().await {
                warn!(hardware = %name, %error, "driver disconnect failed during shutdown");
            }
        }
    }
}

impl Inner {
    fn enqueue_offline(&self, endpoint: &str, payload: serde_json::Value) {
        match &self.offline_queue {
            Some(queue) => {
                if let Err(error) = queue.lock().enqueue(endpoint, payload, Utc::now()) {
                    tracing::error!(%error, endpoint, "failed to enqueue offline entry");
                }
            }
            None => {
                warn!(endpoint, "backend call failed and no offline queue is configured; entry dropped");
            }
        }
    }
}

/// Completion path run once the executor returns (spec.md §4.D
/// "Completion path").
async fn complete(inner: Arc<Inner>, execution_id: ExecutionId, result: ExecutionResult) {
    let wip_context = inner.state.lock().wip_context.clone();
    let overall_pass = result.overall_pass;
    let process_result = if overall_pass { "PASS" } else { "FAIL" };

    let mut wip_status: Option<String> = None;
    let mut can_convert = false;

    if let Some(ctx) = &wip_context {
        let mut measurements = serde_json::Map::new();
        if let Some(duration_secs) = result.duration_secs {
            measurements.insert("duration_ms".to_string(), serde_json::json!(duration_secs * 1000.0));
        }
        let mut defects = Vec::new();
        for step in &result.steps {
            measurements.extend(step.measurements());
            for code in step.defect_codes() {
                if !defects.contains(&code) {
                    defects.push(code);
                }
            }
        }

        let request = CompleteProcessRequest {
            operator_id: ctx.operator_id.clone(),
            result: process_result.to_string(),
            measurements: measurements.into_iter().collect(),
            defects,
            notes: None,
            completed_at: Utc::now(),
        };

        match &inner.backend {
            Some(backend) => match backend.complete_process(ctx.wip_int_id, ctx.process_id, &request).await {
                Ok(response) => {
                    can_convert = response.wip_item.status == "COMPLETED";
                    wip_status = Some(response.wip_item.status);
                }
                Err(error) => {
                    warn!(%error, "complete-process failed; queuing offline");
                    inner.enqueue_offline(
                        "complete_process",
                        serde_json::json!({
                            "wip_int_id": ctx.wip_int_id,
                            "process_id": ctx.process_id,
                            "request": {
                                "operator_id": request.operator_id,
                                "result": request.result,
                                "measurements": request.measurements,
                                "defects": request.defects,
                                "notes": request.notes,
                                "completed_at": request.completed_at,
                            },
                        }),
                    );
                }
            },
            None => inner.enqueue_offline(
                "complete_process",
                serde_json::json!({
                    "wip_int_id": ctx.wip_int_id,
                    "process_id": ctx.process_id,
                    "request": {
                        "operator_id": request.operator_id,
                        "result": request.result,
                        "measurements": request.measurements,
                        "defects": request.defects,
                        "notes": request.notes,
                        "completed_at": request.completed_at,
                    },
                }),
            ),
        }
    }

    let _ = inner.events.send(WorkerEvent::SequenceComplete {
        execution_id,
        overall_pass,
        duration_secs: result.duration_secs,
        steps: result.steps.clone(),
    });

    if let Some(ctx) = &wip_context {
        let _ = inner.events.send(WorkerEvent::WipProcessComplete {
            wip_id: ctx.wip_id.clone(),
            process_id: Some(ctx.process_id),
            result: process_result.to_string(),
            wip_status,
            can_convert,
        });
    }

    if let Some(log) = &inner.execution_log {
        if let Err(error) = log.append(&result, Utc::now()) {
            warn!(%error, "failed to append execution log entry");
        }
    }

    let step_snapshot: Vec<StepListEntry> = result
        .steps
        .iter()
        .map(|step| StepListEntry {
            name: step.name.clone(),
            status: step.status,
            duration_secs: step.duration_secs,
            passed: Some(step.passed),
            result: step.result.clone(),
        })
        .collect();

    let mut state = inner.state.lock();
    state.steps = step_snapshot;
    state.finish_run(execution_id, overall_pass);
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
