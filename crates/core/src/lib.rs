// SPDX-License-Identifier: MIT

//! Shared data model and small abstractions for the station control service:
//! typed ids, the station/sequence config and manifest DTOs, the
//! step/execution result model, the `Sequence`/`HardwareDriver` traits, and
//! the in-process event bus.
//!
//! Every other crate in the workspace depends on this one; it depends on
//! nothing else in the workspace.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod driver;
pub mod event;
pub mod execution;
pub mod id;
pub mod ids;
#[macro_use]
pub mod macros;
pub mod manifest;
pub mod sequence;
pub mod step;

pub use config::{
    BackendConfig, BatchConfig, ConfigIoError, ServerConfig, SimulationConfig,
    SimulationMeasurementConfig, SimulationProcessConfig, StationConfig, StationInfo,
};
pub use driver::{DriverError, DriverHandle, HardwareDriver, HardwareMap};
pub use event::{Event, EventEmitter, EventType, Handler, HandlerId};
pub use execution::{ExecutionResult, ExecutionStatus};
pub use id::IdBuf;
pub use ids::{BatchId, ExecutionId, QueueEntryId, SubscriberId};
pub use manifest::{ManifestError, ManifestParseError, ParameterType, SequenceManifest, StepOverride};
pub use sequence::{ParameterMap, Sequence, SequenceFactory, StepError, StepKind, StepOutcome};
pub use step::{ParameterMeta, StepMeta, StepResult, StepStatus};
