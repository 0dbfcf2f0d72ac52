//! Unix-socket IPC transport from the master side (spec.md §4.C).
//!
//! The supervisor binds a per-batch command socket and event socket,
//! spawns the worker subprocess, and accepts its two connections — the
//! worker always connects out, per `station-worker`'s startup sequence.
//! Grounded on the teacher's daemon protocol client/server split, adapted
//! to this crate's length-prefixed JSON framing instead of ZeroMQ.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use station_wire::{
    read_timed, write_timed, Command, CommandRequest, CommandResponse, ProtocolError, WorkerEvent,
    DEFAULT_TIMEOUT,
};
use tokio::net::{UnixListener, UnixStream};
use tokio::process::Child;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::error::SupervisorError;

/// Master side of the command channel for one worker. The worker's command
/// loop is strictly one-request-at-a-time (spec.md §4.D), so a single
/// mutex around the stream is enough to satisfy "responses matched by
/// request id" without a pending-request table.
pub struct CommandChannel {
    stream: AsyncMutex<UnixStream>,
    request_seq: AtomicU64,
}

impl CommandChannel {
    pub fn new(stream: UnixStream) -> Self {
        Self { stream: AsyncMutex::new(stream), request_seq: AtomicU64::new(0) }
    }

    pub async fn send_command(&self, command: Command) -> Result<CommandResponse, SupervisorError> {
        let request_id = format!("req-{}", self.request_seq.fetch_add(1, Ordering::Relaxed));
        let request = CommandRequest::new(request_id.clone(), command);
        let mut stream = self.stream.lock().await;
        write_timed(&mut *stream, &request, DEFAULT_TIMEOUT).await?;
        let response: CommandResponse = read_timed(&mut *stream, DEFAULT_TIMEOUT).await?;
        if response.request_id != request_id {
            warn!(expected = %request_id, actual = %response.request_id, "command response id mismatch");
        }
        Ok(response)
    }
}

/// Spawn a task that reads `WorkerEvent`s off `event_stream` until it closes
/// or errors, calling `on_event` for each (spec.md §4.C: "delivery from one
/// worker is FIFO"). `on_event` must not block — it runs inline on this task.
pub fn spawn_event_forwarder(
    mut event_stream: UnixStream,
    on_event: impl Fn(WorkerEvent) + Send + Sync + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match read_timed::<WorkerEvent, _>(&mut event_stream, DEFAULT_TIMEOUT).await {
                Ok(event) => on_event(event),
                Err(ProtocolError::ConnectionClosed) => break,
                Err(ProtocolError::Timeout) => continue,
                Err(error) => {
                    error!(%error, "worker event stream read failed; forwarder stopping");
                    break;
                }
            }
        }
    })
}

/// Everything needed to spawn one batch's worker subprocess.
pub struct WorkerSpawnConfig {
    pub worker_binary: PathBuf,
    pub config_path: PathBuf,
    pub batch_id: String,
    pub package_root: PathBuf,
    pub data_dir: PathBuf,
    pub socket_dir: PathBuf,
}

/// A live connection to one worker subprocess.
///
/// `child` sits behind its own async mutex, separate from the command
/// channel's, so the supervisor's monitor loop can poll liveness
/// (`try_wait`) concurrently with an in-flight `send_command` without
/// needing `&mut self` threaded through an `Arc`.
pub struct WorkerHandle {
    pid: Option<u32>,
    child: AsyncMutex<Child>,
    commands: CommandChannel,
    events: JoinHandle<()>,
}

impl WorkerHandle {
    /// Bind the command/event sockets, spawn the worker, and accept its
    /// connections (the worker connects to both before its ready-log line).
    pub async fn spawn(
        config: WorkerSpawnConfig,
        on_event: impl Fn(WorkerEvent) + Send + Sync + 'static,
    ) -> Result<Self, SupervisorError> {
        std::fs::create_dir_all(&config.socket_dir)?;
        let command_socket = config.socket_dir.join(format!("{}-command.sock", config.batch_id));
        let event_socket = config.socket_dir.join(format!("{}-event.sock", config.batch_id));
        let _ = std::fs::remove_file(&command_socket);
        let _ = std::fs::remove_file(&event_socket);

        let command_listener = UnixListener::bind(&command_socket)?;
        let event_listener = UnixListener::bind(&event_socket)?;

        let child = tokio::process::Command::new(&config.worker_binary)
            .arg("--config")
            .arg(&config.config_path)
            .arg("--batch-id")
            .arg(&config.batch_id)
            .arg("--command-socket")
            .arg(&command_socket)
            .arg("--event-socket")
            .arg(&event_socket)
            .arg("--package-root")
            .arg(&config.package_root)
            .arg("--data-dir")
            .arg(&config.data_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let pid = child.id();

        let (command_stream, _) = command_listener.accept().await?;
        let (event_stream, _) = event_listener.accept().await?;

        Ok(Self {
            pid,
            child: AsyncMutex::new(child),
            commands: CommandChannel::new(command_stream),
            events: spawn_event_forwarder(event_stream, on_event),
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub async fn send_command(&self, command: Command) -> Result<CommandResponse, SupervisorError> {
        self.commands.send_command(command).await
    }

    /// `Some(status)` once the worker process has exited — spec.md §4.E's
    /// monitor loop polls this to detect a crash.
    pub async fn try_wait(&self) -> std::io::Result<Option<std::process::ExitStatus>> {
        self.child.lock().await.try_wait()
    }

    pub async fn kill(&self) -> std::io::Result<()> {
        let mut child = self.child.lock().await;
        child.start_kill()?;
        let _ = child.wait().await;
        Ok(())
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.events.abort();
    }
}

#[cfg(test)]
#[path = "ipc_tests.rs"]
mod tests;
