// SPDX-License-Identifier: MIT

//! IPC transport for the station control service (spec.md §4.C).
//!
//! Wire format: 4-byte big-endian length prefix + JSON payload, grounded on
//! the teacher's daemon protocol codec. Two logical channels ride this
//! transport: [`command`] (master→worker request/response) and [`event`]
//! (worker→master fan-out). [`frame`] shapes the outer push-client surface.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

mod command;
mod event;
mod frame;
mod wire;

pub use command::{
    Command, CommandOutcome, CommandRequest, CommandResponse, ManualControlArgs, RoutedCommand,
    StatusFlags,
};
pub use event::{BatchEvent, LogLevel, StatusUpdate, WorkerEvent};
pub use frame::{parse_inbound, FrameType, InboundFrame, OutboundFrame};
pub use wire::{
    decode, encode, read_message, read_timed, write_message, write_timed, ProtocolError,
    DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE,
};
