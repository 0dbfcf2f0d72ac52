//! Master→worker command channel (spec.md §4.C): request/response, every
//! command carries a request id that the response must echo.

use serde::{Deserialize, Serialize};
use station_core::BatchId;

/// A single `MANUAL_CONTROL` invocation target and arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualControlArgs {
    pub hardware: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Flags controlling how much detail `GET_STATUS` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusFlags {
    #[serde(default)]
    pub include_hardware: bool,
    #[serde(default)]
    pub include_statistics: bool,
}

/// A command sent from the master to one worker's subprocess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    StartSequence {
        #[serde(default)]
        parameters: serde_json::Map<String, serde_json::Value>,
    },
    StopSequence,
    GetStatus {
        #[serde(default)]
        flags: StatusFlags,
    },
    ManualControl(ManualControlArgs),
    Shutdown,
    Ping,
}

/// Envelope wrapping a [`Command`] with the request id the response must echo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub request_id: String,
    pub command: Command,
}

impl CommandRequest {
    pub fn new(request_id: impl Into<String>, command: Command) -> Self {
        Self { request_id: request_id.into(), command }
    }
}

/// A worker's reply to a [`CommandRequest`], matched by `request_id` (spec.md
/// §4.C: "Responses are matched strictly by request id, not by arrival order").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub request_id: String,
    #[serde(flatten)]
    pub outcome: CommandOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CommandOutcome {
    Ok { #[serde(default)] data: serde_json::Value },
    Error { error: String },
}

impl CommandResponse {
    pub fn ok(request_id: impl Into<String>, data: serde_json::Value) -> Self {
        Self { request_id: request_id.into(), outcome: CommandOutcome::Ok { data } }
    }

    pub fn error(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self { request_id: request_id.into(), outcome: CommandOutcome::Error { error: error.into() } }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, CommandOutcome::Ok { .. })
    }
}

/// Routing wrapper so the IPC server can dispatch a command to the right
/// worker's connection before unwrapping the inner `Command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedCommand {
    pub batch_id: BatchId,
    pub request: CommandRequest,
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
