//! Event-emitter wildcard handler → outbound-frame translation table
//! (spec.md §4.I): internal [`Event`]s become the `{type, batch_id?, data}`
//! frames pushed to subscribers.

use station_core::{Event, EventType};
use station_wire::{FrameType, OutboundFrame};

/// Translate one internal event into the outbound frame it produces, or
/// `None` for event types the push surface doesn't forward (e.g.
/// `BATCH_STARTED`/`BATCH_STOPPED`/`BATCH_CRASHED`, which are supervisor
/// bookkeeping, not the six types spec.md §4.I names).
pub fn translate(event: &Event) -> Option<OutboundFrame> {
    let frame_type = match event.event_type {
        EventType::BatchStatusChanged => FrameType::BatchStatus,
        EventType::StepStarted => FrameType::StepStart,
        EventType::StepCompleted => FrameType::StepComplete,
        EventType::SequenceCompleted => FrameType::SequenceComplete,
        EventType::Log => FrameType::Log,
        EventType::Error => FrameType::Error,
        EventType::BatchStarted
        | EventType::BatchStopped
        | EventType::BatchCrashed
        | EventType::WipProcessComplete => return None,
    };
    let data = serde_json::Value::Object(event.data.clone());
    Some(match event.batch_id {
        Some(batch_id) => OutboundFrame::scoped(frame_type, batch_id, data),
        None => OutboundFrame::new(frame_type, data),
    })
}

/// Register `translate` as a wildcard handler that forwards every frame it
/// produces to `registry`, batch-scoped when the event carries a batch id.
pub fn install(emitter: &station_core::EventEmitter, registry: std::sync::Arc<crate::registry::SubscriberRegistry>) {
    emitter.on_any(std::sync::Arc::new(move |event: &Event| {
        if let Some(frame) = translate(event) {
            match frame.batch_id {
                Some(batch_id) => registry.broadcast(batch_id, &frame),
                None => registry.broadcast_all(&frame),
            }
        }
    }));
}

#[cfg(test)]
#[path = "frames_tests.rs"]
mod tests;
