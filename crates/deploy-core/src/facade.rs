//! Programmatic deployment API
//!
//! The facade only touches the filesystem. Copying an artifact into a
//! handler directory or removing it from there is picked up by the next
//! repository scan, which performs the actual handler calls.

use std::path::Path;
use std::sync::Arc;

use deploy_fs::{NormalizedPath, io};

use crate::engine::{BatchReport, DeploymentEngine};
use crate::error::{Error, Result};
use crate::unit::UnitType;

/// Deploy, undeploy and redeploy artifacts by type.
#[derive(Clone)]
pub struct DeploymentFacade {
    engine: Arc<DeploymentEngine>,
}

impl DeploymentFacade {
    pub fn new(engine: Arc<DeploymentEngine>) -> Self {
        Self { engine }
    }

    /// Copy the file or directory at `artifact` into the directory of the
    /// handler for `unit_type`.
    ///
    /// Returns the path of the copied artifact. An artifact with the same
    /// name is replaced.
    ///
    /// # Errors
    ///
    /// [`Error::NoHandler`] when no handler is registered for the type,
    /// [`Error::NotStarted`] before the engine starts and [`Error::Fs`] when
    /// the copy fails.
    pub fn deploy(&self, artifact: impl AsRef<Path>, unit_type: &UnitType) -> Result<NormalizedPath> {
        let directory = self.engine.handler_directory(unit_type)?;
        let target = io::copy_atomic(artifact.as_ref(), &directory)?;
        tracing::info!(
            unit_type = %unit_type,
            artifact = %artifact.as_ref().display(),
            target = %target,
            "Copied artifact into repository"
        );
        Ok(target)
    }

    /// Delete the artifact backing the deployed unit `(unit_type, key)`.
    ///
    /// # Errors
    ///
    /// [`Error::NotDeployed`] when no such unit is deployed, [`Error::Fs`]
    /// when the removal fails.
    pub fn undeploy(&self, key: &str, unit_type: &UnitType) -> Result<()> {
        let unit = self
            .engine
            .deployed_unit(unit_type, key)
            .ok_or_else(|| Error::NotDeployed {
                unit_type: unit_type.clone(),
                key: key.to_string(),
            })?;

        io::remove_tree(&unit.path.to_native())?;
        tracing::info!(unit_type = %unit_type, key, path = %unit.path, "Removed artifact from repository");
        Ok(())
    }

    /// Undeploy then deploy the unit `(unit_type, key)` through its handler,
    /// leaving the artifact on disk untouched.
    pub fn redeploy(&self, key: &str, unit_type: &UnitType) -> Result<BatchReport> {
        self.engine.redeploy_unit(unit_type, key)
    }

    pub fn engine(&self) -> &Arc<DeploymentEngine> {
        &self.engine
    }
}
