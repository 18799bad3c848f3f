//! Artifact deployment reconciliation engine
//!
//! Keeps a repository of handler directories in sync with an in-memory model
//! of deployed units:
//!
//! - **Handlers**: pluggable deployers, one per unit type and directory
//! - **DeploymentEngine**: registry, deployed/faulty tracking and per-unit
//!   fault isolation for deploy, update and undeploy batches
//! - **RepositoryScanner**: mark-and-sweep diff of the disk against the engine
//! - **Lifecycle events**: before/after notifications delivered to listeners
//! - **DeploymentFacade**: copy artifacts in and out of handler directories
//! - **ScanScheduler**: periodic scans on a tokio runtime
//!
//! # Architecture
//!
//! ```text
//!   ScanScheduler    DeploymentFacade
//!         |                 |
//!  RepositoryScanner        |
//!         |                 |
//!         +--- DeploymentEngine ---+
//!              |        |          |
//!       HandlerRegistry UnitTracker LifecycleNotifier
//!              |
//!          deploy-fs
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use deploy_core::{DeploymentEngine, RepositoryScanner, Result};
//!
//! fn example(handler: Arc<dyn deploy_core::Handler>) -> Result<()> {
//!     let engine = DeploymentEngine::shared();
//!     engine.register_handler(handler)?;
//!     engine.start("/srv/deployment")?;
//!
//!     let scanner = RepositoryScanner::new(Arc::clone(&engine));
//!     let report = scanner.scan()?;
//!     println!("deployed {}", report.swept.deployed.succeeded());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod facade;
pub mod handler;
pub mod lifecycle;
pub mod logging;
pub mod registry;
pub mod scanner;
pub mod scheduler;
pub mod tracker;
pub mod unit;

pub use config::DeploymentConfig;
pub use engine::{BatchReport, DeploymentEngine, UnitOutcome};
pub use error::{Error, Result};
pub use facade::DeploymentFacade;
pub use handler::{Handler, HandlerContext, OperationError};
pub use lifecycle::{
    Lifecycle, LifecycleEvent, LifecycleEventType, LifecycleListener, LifecycleNotifier,
    LifecycleState, ListenerId, NotificationError, Operation,
};
pub use registry::{HandlerRegistry, RegistrationError};
pub use scanner::{
    MarkSummary, RepositoryScanner, ScanCycle, ScanPhase, ScanReport, SweepReport, WorkLists,
};
pub use scheduler::ScanScheduler;
pub use tracker::{TrackedState, TrackedUnit, UnitMap, UnitTracker};
pub use unit::{DEFAULT_VERSION, Unit, UnitType};
