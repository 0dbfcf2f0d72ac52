//! Push-client frame shapes (spec.md §6, §4.I): what the daemon sends to
//! connected UI/websocket clients, and what clients send back.

use serde::{Deserialize, Serialize};
use station_core::BatchId;

/// Outbound JSON frame sent to a push client.
///
/// `{type, batch_id?, data}` exactly as spec.md §6 describes; `type` is one
/// of the values enumerated there. Batch-scoped frames carry `batch_id` so
/// subscribers can filter; broadcast frames (e.g. `batch_created`) omit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    pub data: serde_json::Value,
}

impl OutboundFrame {
    pub fn new(frame_type: FrameType, data: serde_json::Value) -> Self {
        Self { frame_type, batch_id: None, data }
    }

    pub fn scoped(frame_type: FrameType, batch_id: BatchId, data: serde_json::Value) -> Self {
        Self { frame_type, batch_id: Some(batch_id), data }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    BatchStatus,
    StepStart,
    StepComplete,
    SequenceComplete,
    Log,
    Error,
    BatchCreated,
    BatchDeleted,
    Subscribed,
    Unsubscribed,
}

/// A frame sent by a push client to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    Subscribe { batch_ids: Vec<BatchId> },
    Unsubscribe { batch_ids: Vec<BatchId> },
}

/// Parse an inbound client frame, mapping malformed JSON to the standardized
/// `INVALID_JSON` error frame spec.md §6 specifies.
pub fn parse_inbound(text: &str) -> Result<InboundFrame, OutboundFrame> {
    serde_json::from_str(text).map_err(|e| {
        OutboundFrame::new(
            FrameType::Error,
            serde_json::json!({ "code": "INVALID_JSON", "message": e.to_string() }),
        )
    })
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
