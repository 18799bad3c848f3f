//! Lifecycle events for deployment operations
//!
//! Every deploy, update and undeploy attempt produces a [`Lifecycle`]
//! record. The engine wraps it in [`LifecycleEvent`]s fired before and after
//! the handler runs and hands them to the [`LifecycleNotifier`].

mod event;
mod notifier;

pub use event::{Lifecycle, LifecycleEvent, LifecycleEventType, LifecycleState, Operation};
pub use notifier::{LifecycleListener, LifecycleNotifier, ListenerId, NotificationError};
