//! [`RecordingListener`]: captures lifecycle events for assertions.

use std::sync::atomic::{AtomicBool, Ordering};

use deploy_core::{
    LifecycleEvent, LifecycleEventType, LifecycleListener, LifecycleState, NotificationError,
    Operation,
};
use parking_lot::Mutex;

/// The fields of a lifecycle event tests usually assert on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub event_type: LifecycleEventType,
    pub operation: Operation,
    pub state: LifecycleState,
    pub key: String,
    pub message: Option<String>,
}

#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<RecordedEvent>>,
    failing: AtomicBool,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener that records every event and then reports an error.
    pub fn failing() -> Self {
        let listener = Self::default();
        listener.failing.store(true, Ordering::SeqCst);
        listener
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Events recorded for `key`, in delivery order.
    pub fn events_for(&self, key: &str) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.key == key)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl LifecycleListener for RecordingListener {
    fn on_event(&self, event: &LifecycleEvent) -> Result<(), NotificationError> {
        let lifecycle = event.lifecycle();
        self.events.lock().push(RecordedEvent {
            event_type: event.event_type(),
            operation: lifecycle.operation(),
            state: lifecycle.state(),
            key: lifecycle.unit().key.clone(),
            message: lifecycle.message().map(str::to_string),
        });

        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::new("recording listener configured to fail"));
        }
        Ok(())
    }
}
