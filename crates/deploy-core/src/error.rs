//! Error types for deploy-core
//!
//! Only configuration, registration and facade failures are errors. Handler
//! and listener failures are recorded per unit instead (see
//! [`crate::BatchReport`] and [`crate::OperationError`]).

use std::path::PathBuf;

use crate::registry::RegistrationError;
use crate::unit::UnitType;

/// Result type for deploy-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in deploy-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Repository path missing, not a directory, or unreadable
    #[error("Cannot find repository: {}", path.display())]
    RepositoryNotFound { path: PathBuf },

    /// Handler location uses a URL scheme other than `file:`
    #[error("Unsupported location '{location}' for handler {handler}")]
    UnsupportedLocation { handler: String, location: String },

    /// Deployment configuration failed validation
    #[error("Invalid deployment configuration: {message}")]
    InvalidConfig { message: String },

    /// Handler registration refused
    #[error("Handler registration failed: {0}")]
    Registration(#[from] RegistrationError),

    /// Operation needs a started engine
    #[error("Deployment engine has not been started")]
    NotStarted,

    /// No handler registered for the requested unit type
    #[error("No handler registered for unit type {unit_type}")]
    NoHandler { unit_type: UnitType },

    /// No deployed unit for the requested type and key
    #[error("Unit {key} of type {unit_type} is not deployed")]
    NotDeployed { unit_type: UnitType, key: String },

    /// Filesystem error from deploy-fs
    #[error(transparent)]
    Fs(#[from] deploy_fs::Error),
}

impl Error {
    /// True for the fatal configuration errors surfaced by `start()`.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::RepositoryNotFound { .. } | Self::UnsupportedLocation { .. } | Self::InvalidConfig { .. }
        )
    }
}
