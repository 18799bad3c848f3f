//! Shared test utilities for the deployment workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`repo`]: [`TestRepository`] temporary repository with artifact helpers
//! - [`handler`]: [`RecordingHandler`] that logs every call and fails on demand
//! - [`listener`]: [`RecordingListener`] that captures lifecycle events

pub mod handler;
pub mod listener;
pub mod repo;

pub use handler::{Call, CallLog, RecordingHandler};
pub use listener::{RecordedEvent, RecordingListener};
pub use repo::{TestRepository, touch};
