//! Lifecycle record and event types

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::unit::Unit;

/// Engine operation a lifecycle record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Deploy,
    Update,
    Undeploy,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deploy => "deploy",
            Self::Update => "update",
            Self::Undeploy => "undeploy",
        }
    }

    /// Event fired before the handler runs.
    pub fn before_event(&self) -> LifecycleEventType {
        match self {
            Self::Deploy | Self::Update => LifecycleEventType::BeforeStart,
            Self::Undeploy => LifecycleEventType::BeforeStop,
        }
    }

    /// Event fired once the outcome is known.
    pub fn after_event(&self) -> LifecycleEventType {
        match self {
            Self::Deploy | Self::Update => LifecycleEventType::AfterStart,
            Self::Undeploy => LifecycleEventType::AfterStop,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleEventType {
    BeforeStart,
    AfterStart,
    BeforeStop,
    AfterStop,
}

impl fmt::Display for LifecycleEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeStart => write!(f, "BEFORE_START"),
            Self::AfterStart => write!(f, "AFTER_START"),
            Self::BeforeStop => write!(f, "BEFORE_STOP"),
            Self::AfterStop => write!(f, "AFTER_STOP"),
        }
    }
}

/// Outcome carried by a lifecycle record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// The handler has not run yet (before-events)
    Pending,
    Successful,
    Failed,
}

/// One operation attempt on a unit.
///
/// Built with the `with_*` methods, then frozen inside a [`LifecycleEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lifecycle {
    unit: Unit,
    operation: Operation,
    timestamp: DateTime<Utc>,
    state: LifecycleState,
    message: Option<String>,
    #[serde(default)]
    properties: HashMap<String, Value>,
}

impl Lifecycle {
    pub fn new(unit: Unit, operation: Operation, state: LifecycleState) -> Self {
        Self {
            unit,
            operation,
            timestamp: Utc::now(),
            state,
            message: None,
            properties: HashMap::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn properties(&self) -> &HashMap<String, Value> {
        &self.properties
    }
}

/// A lifecycle transition delivered to listeners.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    event_type: LifecycleEventType,
    lifecycle: Arc<Lifecycle>,
}

impl LifecycleEvent {
    pub fn new(event_type: LifecycleEventType, lifecycle: Lifecycle) -> Self {
        Self {
            event_type,
            lifecycle: Arc::new(lifecycle),
        }
    }

    pub fn event_type(&self) -> LifecycleEventType {
        self.event_type
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_event_mapping() {
        assert_eq!(Operation::Deploy.before_event(), LifecycleEventType::BeforeStart);
        assert_eq!(Operation::Update.after_event(), LifecycleEventType::AfterStart);
        assert_eq!(Operation::Undeploy.before_event(), LifecycleEventType::BeforeStop);
        assert_eq!(Operation::Undeploy.after_event(), LifecycleEventType::AfterStop);
    }

    #[test]
    fn test_lifecycle_builder() {
        let unit = Unit::new("/repo/text-files/a.txt", "txt");
        let lifecycle = Lifecycle::new(unit, Operation::Deploy, LifecycleState::Failed)
            .with_message("boom")
            .with_property("attempt", 2);

        assert_eq!(lifecycle.state(), LifecycleState::Failed);
        assert_eq!(lifecycle.message(), Some("boom"));
        assert_eq!(lifecycle.properties()["attempt"], Value::from(2));
        assert_eq!(lifecycle.unit().key, "a.txt");
    }

    #[test]
    fn test_event_type_display_and_serde_agree() {
        let json = serde_json::to_string(&LifecycleEventType::AfterStop).unwrap();
        assert_eq!(json, format!("\"{}\"", LifecycleEventType::AfterStop));
    }
}
