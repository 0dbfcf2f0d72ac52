// SPDX-License-Identifier: MIT

//! Typed backend HTTP client for the station control service (spec.md §4.H).

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

mod client;
mod error;
mod types;

pub use client::{BackendClient, BackendClientConfig, TokenRefreshCallback};
pub use error::BackendError;
pub use types::{
    BackendErrorBody, CompleteProcessRequest, CompleteProcessResponse, ConvertToSerialRequest,
    LoginResponse, StartProcessRequest, WipInfo, WipItemStatus,
};
