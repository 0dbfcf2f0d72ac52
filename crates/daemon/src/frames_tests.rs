use super::*;
use crate::registry::{Subscriber, SubscriberRegistry};
use chrono::Utc;
use parking_lot::Mutex;
use station_core::BatchId;
use std::sync::Arc;

fn event(event_type: EventType, batch_id: Option<BatchId>) -> Event {
    let mut e = Event::new(event_type, Utc::now());
    if let Some(batch_id) = batch_id {
        e = e.with_batch_id(batch_id);
    }
    e
}

#[test]
fn forwarded_types_translate_to_the_documented_frame_type() {
    let batch_id = BatchId::new();
    let cases = [
        (EventType::BatchStatusChanged, FrameType::BatchStatus),
        (EventType::StepStarted, FrameType::StepStart),
        (EventType::StepCompleted, FrameType::StepComplete),
        (EventType::SequenceCompleted, FrameType::SequenceComplete),
        (EventType::Log, FrameType::Log),
        (EventType::Error, FrameType::Error),
    ];
    for (event_type, frame_type) in cases {
        let frame = translate(&event(event_type, Some(batch_id))).expect("forwarded type");
        assert_eq!(frame.frame_type, frame_type);
        assert_eq!(frame.batch_id, Some(batch_id));
    }
}

#[test]
fn non_forwarded_types_translate_to_nothing() {
    for event_type in [EventType::BatchStarted, EventType::BatchStopped, EventType::BatchCrashed, EventType::WipProcessComplete] {
        assert!(translate(&event(event_type, None)).is_none());
    }
}

#[test]
fn batchless_event_produces_an_unscoped_frame() {
    let frame = translate(&event(EventType::Log, None)).expect("log is forwarded");
    assert_eq!(frame.batch_id, None);
}

struct RecordingSubscriber {
    received: Arc<Mutex<Vec<OutboundFrame>>>,
}

impl Subscriber for RecordingSubscriber {
    fn send(&self, frame: &OutboundFrame) -> Result<(), String> {
        self.received.lock().push(frame.clone());
        Ok(())
    }
}

#[test]
fn installed_handler_forwards_scoped_events_to_interested_subscribers_only() {
    let emitter = station_core::EventEmitter::new();
    let registry = Arc::new(SubscriberRegistry::new());
    install(&emitter, registry.clone());

    let received = Arc::new(Mutex::new(Vec::new()));
    let id = registry.connect(Box::new(RecordingSubscriber { received: received.clone() }));
    let batch_id = BatchId::new();
    registry.subscribe(id, [batch_id]);

    emitter.emit(event(EventType::StepStarted, Some(batch_id)));
    emitter.emit(event(EventType::StepStarted, Some(BatchId::new())));

    assert_eq!(received.lock().len(), 1);
}

#[test]
fn installed_handler_drops_events_with_no_frame_mapping() {
    let emitter = station_core::EventEmitter::new();
    let registry = Arc::new(SubscriberRegistry::new());
    install(&emitter, registry.clone());

    let received = Arc::new(Mutex::new(Vec::new()));
    registry.connect(Box::new(RecordingSubscriber { received: received.clone() }));

    emitter.emit(event(EventType::BatchStarted, None));

    assert!(received.lock().is_empty());
}
