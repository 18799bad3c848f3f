//! Handler registry keyed by unit type

use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::{Handler, OperationError};
use crate::unit::UnitType;

/// Reasons a handler registration is refused.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("handler {handler} has no location")]
    MissingLocation { handler: String },

    #[error("handler {handler} has no unit type")]
    MissingType { handler: String },

    #[error("handler for unit type '{unit_type}' has no name")]
    MissingName { unit_type: UnitType },

    #[error("handler {handler} failed to initialize: {source}")]
    InitFailed {
        handler: String,
        #[source]
        source: OperationError,
    },
}

/// Registered handlers, one per unit type.
///
/// Registering a second handler for a type replaces the first.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<UnitType, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that a handler carries a location, a unit type and a name.
    pub fn validate(handler: &dyn Handler) -> Result<(), RegistrationError> {
        if handler.location().trim().is_empty() {
            return Err(RegistrationError::MissingLocation {
                handler: handler.name().to_string(),
            });
        }
        if handler.unit_type().is_nil() {
            return Err(RegistrationError::MissingType {
                handler: handler.name().to_string(),
            });
        }
        if handler.name().trim().is_empty() {
            return Err(RegistrationError::MissingName {
                unit_type: handler.unit_type().clone(),
            });
        }
        Ok(())
    }

    /// Register a handler, returning the one it replaced, if any.
    pub fn register(
        &mut self,
        handler: Arc<dyn Handler>,
    ) -> Result<Option<Arc<dyn Handler>>, RegistrationError> {
        Self::validate(handler.as_ref())?;

        let unit_type = handler.unit_type().clone();
        let replaced = self.handlers.insert(unit_type.clone(), handler);
        if let Some(previous) = &replaced {
            tracing::warn!(
                unit_type = %unit_type,
                previous = previous.name(),
                "Replacing handler already registered for unit type"
            );
        }
        Ok(replaced)
    }

    /// Remove the registration for the handler's unit type.
    ///
    /// Unregistering a type that is not registered is a no-op.
    pub fn unregister(
        &mut self,
        handler: &dyn Handler,
    ) -> Result<Option<Arc<dyn Handler>>, RegistrationError> {
        if handler.unit_type().is_nil() {
            return Err(RegistrationError::MissingType {
                handler: handler.name().to_string(),
            });
        }
        Ok(self.handlers.remove(handler.unit_type()))
    }

    pub fn lookup(&self, unit_type: &UnitType) -> Option<Arc<dyn Handler>> {
        self.handlers.get(unit_type).cloned()
    }

    pub fn contains(&self, unit_type: &UnitType) -> bool {
        self.handlers.contains_key(unit_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered unit types (sorted).
    pub fn unit_types(&self) -> Vec<UnitType> {
        let mut types: Vec<_> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }

    /// All handlers, sorted by unit type.
    pub fn handlers(&self) -> Vec<Arc<dyn Handler>> {
        let mut handlers: Vec<_> = self.handlers.values().cloned().collect();
        handlers.sort_by(|a, b| a.unit_type().cmp(b.unit_type()));
        handlers
    }
}
