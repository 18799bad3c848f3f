//! Handler contract implemented by deployment plugins
//!
//! A handler owns one unit type and one directory in the repository. The
//! engine calls it to perform the actual deploy/update/undeploy side effect;
//! any error it returns is recorded against the unit and never aborts the
//! surrounding batch.

use deploy_fs::NormalizedPath;

use crate::unit::{Unit, UnitType};

/// Error returned by a handler for a single unit.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct OperationError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl OperationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, keeping it as the error source.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for OperationError {
    fn from(e: std::io::Error) -> Self {
        Self::with_source(e.to_string(), e)
    }
}

/// Paths handed to a handler when it becomes active.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    /// Canonical repository root
    pub repository: NormalizedPath,
    /// Resolved directory the handler's units live in
    pub directory: NormalizedPath,
}

/// A pluggable deployer bound to one unit type.
pub trait Handler: Send + Sync {
    /// Human-readable handler name, used in logs.
    fn name(&self) -> &str;

    /// The unit type this handler deploys.
    fn unit_type(&self) -> &UnitType;

    /// Directory of this handler's units: a path relative to the repository
    /// root, an absolute path, or a `file:` URL.
    fn location(&self) -> &str;

    /// Called once the handler's directory is known, either on registration
    /// with a started engine or when the engine starts.
    fn init(&self, _context: &HandlerContext) -> Result<(), OperationError> {
        Ok(())
    }

    fn deploy(&self, unit: &Unit) -> Result<(), OperationError>;

    fn update(&self, unit: &Unit) -> Result<(), OperationError>;

    fn undeploy(&self, key: &str) -> Result<(), OperationError>;
}
