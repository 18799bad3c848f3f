//! Synchronous, failure-isolated delivery of lifecycle events

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::LifecycleEvent;

/// Error a listener may report; the notifier logs and drops it.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct NotificationError {
    message: String,
}

impl NotificationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Observer of deployment lifecycle events.
///
/// Listeners run on the deploying thread and should return quickly. An
/// error is logged and never reaches the deployment pipeline.
pub trait LifecycleListener: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent) -> Result<(), NotificationError>;
}

/// Handle returned by [`LifecycleNotifier::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Delivers events to listeners in registration order.
#[derive(Default)]
pub struct LifecycleNotifier {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn LifecycleListener>)>>,
    next_id: AtomicU64,
}

impl LifecycleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn LifecycleListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// Remove a listener. Returns false if the id was unknown.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Deliver `event` to every listener.
    ///
    /// Returns the number of listeners that accepted the event.
    pub fn notify(&self, event: &LifecycleEvent) -> usize {
        // Snapshot so listeners may (un)register without deadlocking.
        let listeners: Vec<_> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        let mut delivered = 0;
        for listener in listeners {
            match listener.on_event(event) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    let unit = event.lifecycle().unit();
                    tracing::warn!(
                        event = %event.event_type(),
                        unit_type = %unit.unit_type,
                        key = %unit.key,
                        error = %e,
                        "Lifecycle listener failed"
                    );
                }
            }
        }
        delivered
    }
}
