//! Deployment engine
//!
//! The engine owns the handler registry, the deployed/faulty tracker and the
//! lifecycle notifier. It is an explicit context value: hosts build one,
//! wrap it in an `Arc` and hand it to the scanner, scheduler and facade.
//!
//! Batch operations never fail as a whole. Each unit is dispatched to its
//! handler independently and the outcome is recorded in the tracker, in a
//! lifecycle event and in the returned [`BatchReport`].

use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use deploy_fs::{NormalizedPath, resolve_location};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::handler::{Handler, HandlerContext, OperationError};
use crate::lifecycle::{
    Lifecycle, LifecycleEvent, LifecycleEventType, LifecycleListener, LifecycleNotifier,
    LifecycleState, ListenerId, Operation,
};
use crate::registry::{HandlerRegistry, RegistrationError};
use crate::tracker::{UnitMap, UnitTracker};
use crate::unit::{Unit, UnitType};

/// Outcome of one unit within a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitOutcome {
    pub unit_type: UnitType,
    pub key: String,
    pub operation: Operation,
    pub state: LifecycleState,
    pub message: Option<String>,
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        self.state == LifecycleState::Successful
    }
}

/// Per-unit results of a deploy, update or undeploy batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub operation: Operation,
    pub outcomes: Vec<UnitOutcome>,
}

impl BatchReport {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            outcomes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Outcome for the given key, if the batch contained it.
    pub fn outcome(&self, key: &str) -> Option<&UnitOutcome> {
        self.outcomes.iter().find(|o| o.key == key)
    }
}

/// Reconciles units against their handlers.
#[derive(Default)]
pub struct DeploymentEngine {
    repository: OnceLock<NormalizedPath>,
    start_lock: Mutex<()>,
    registry: RwLock<HandlerRegistry>,
    tracker: UnitTracker,
    notifier: LifecycleNotifier,
}

impl DeploymentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine ready to be shared with a scanner and facade.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Start the engine on a repository directory.
    ///
    /// Handlers registered before the start are activated. All locations
    /// are resolved first, so an unsupported location fails the start
    /// before any directory is created or `init` called. Then each
    /// handler's directory is created and its `init` called. The first
    /// successful call wins; later calls are no-ops.
    ///
    /// # Errors
    ///
    /// [`Error::RepositoryNotFound`] when the path is not a readable
    /// directory, [`Error::UnsupportedLocation`] or a registration error
    /// when a pending handler cannot be activated. The engine stays
    /// unstarted on error.
    pub fn start(&self, repository: impl AsRef<Path>) -> Result<()> {
        let _guard = self.start_lock.lock();

        if let Some(existing) = self.repository.get() {
            tracing::debug!(repository = %existing, "Deployment engine already started");
            return Ok(());
        }

        let path = repository.as_ref();
        let not_found = || Error::RepositoryNotFound {
            path: path.to_path_buf(),
        };
        if !path.is_dir() || fs::read_dir(path).is_err() {
            return Err(not_found());
        }
        let root = NormalizedPath::new(path)
            .canonicalize()
            .map_err(|_| not_found())?;

        let handlers = self.registry.read().handlers();
        // Every location must resolve before any handler is touched
        let directories = handlers
            .iter()
            .map(|handler| resolve_handler_location(&root, handler.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        for (handler, directory) in handlers.iter().zip(directories) {
            activate(&root, handler.as_ref(), directory)?;
        }

        let _ = self.repository.set(root.clone());
        tracing::info!(
            repository = %root,
            handlers = handlers.len(),
            "Deployment engine started"
        );
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.repository.get().is_some()
    }

    /// Canonical repository root, once started.
    pub fn repository(&self) -> Option<&NormalizedPath> {
        self.repository.get()
    }

    /// Register a handler, replacing any handler of the same unit type.
    ///
    /// On a started engine the handler is activated before it becomes
    /// visible to scans.
    pub fn register_handler(&self, handler: Arc<dyn Handler>) -> Result<()> {
        let _guard = self.start_lock.lock();

        HandlerRegistry::validate(handler.as_ref())?;
        if let Some(root) = self.repository.get() {
            let directory = resolve_handler_location(root, handler.as_ref())?;
            activate(root, handler.as_ref(), directory)?;
        }

        let name = handler.name().to_string();
        let unit_type = handler.unit_type().clone();
        self.registry.write().register(handler)?;
        tracing::info!(handler = %name, unit_type = %unit_type, "Registered handler");
        Ok(())
    }

    /// Remove the handler registered for this handler's unit type.
    ///
    /// Units it deployed stay tracked until the next scan undeploys them.
    pub fn unregister_handler(&self, handler: &dyn Handler) -> Result<()> {
        let removed = self.registry.write().unregister(handler)?;
        if removed.is_some() {
            tracing::info!(
                handler = handler.name(),
                unit_type = %handler.unit_type(),
                "Unregistered handler"
            );
        }
        Ok(())
    }

    pub fn handler(&self, unit_type: &UnitType) -> Option<Arc<dyn Handler>> {
        self.registry.read().lookup(unit_type)
    }

    /// All registered handlers, sorted by unit type.
    pub fn handlers(&self) -> Vec<Arc<dyn Handler>> {
        self.registry.read().handlers()
    }

    /// Absolute directory holding units of `unit_type`.
    pub fn handler_directory(&self, unit_type: &UnitType) -> Result<NormalizedPath> {
        let root = self.repository.get().ok_or(Error::NotStarted)?;
        let handler = self.handler(unit_type).ok_or_else(|| Error::NoHandler {
            unit_type: unit_type.clone(),
        })?;
        resolve_handler_location(root, handler.as_ref())
    }

    pub fn add_listener(&self, listener: Arc<dyn LifecycleListener>) -> ListenerId {
        self.notifier.register(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.notifier.unregister(id)
    }

    pub fn tracker(&self) -> &UnitTracker {
        &self.tracker
    }

    pub fn deployed_unit(&self, unit_type: &UnitType, key: &str) -> Option<Unit> {
        self.tracker.deployed(unit_type, key)
    }

    pub fn deployed_units(&self) -> UnitMap {
        self.tracker.deployed_units()
    }

    pub fn faulty_units(&self) -> UnitMap {
        self.tracker.faulty_units()
    }

    /// Deploy each unit through its handler.
    ///
    /// Units without a handler, or whose handler fails, land in the faulty
    /// set. Successful units move to the deployed set.
    pub fn deploy_units(&self, units: Vec<Unit>) -> BatchReport {
        self.run_batch(Operation::Deploy, units)
    }

    /// Update each unit through its handler. A faulty unit that updates
    /// successfully is promoted to the deployed set.
    pub fn update_units(&self, units: Vec<Unit>) -> BatchReport {
        self.run_batch(Operation::Update, units)
    }

    /// Undeploy each unit through its handler.
    ///
    /// The unit leaves both sets whatever the handler returns.
    pub fn undeploy_units(&self, units: Vec<Unit>) -> BatchReport {
        self.run_batch(Operation::Undeploy, units)
    }

    /// Undeploy then deploy the currently deployed unit `(unit_type, key)`
    /// without touching its artifact on disk.
    pub fn redeploy_unit(&self, unit_type: &UnitType, key: &str) -> Result<BatchReport> {
        let unit = self
            .deployed_unit(unit_type, key)
            .ok_or_else(|| Error::NotDeployed {
                unit_type: unit_type.clone(),
                key: key.to_string(),
            })?;

        self.undeploy_units(vec![unit.clone()]);
        Ok(self.deploy_units(vec![unit]))
    }

    fn run_batch(&self, operation: Operation, units: Vec<Unit>) -> BatchReport {
        let mut report = BatchReport::new(operation);
        for unit in units {
            report.outcomes.push(self.apply(operation, unit));
        }
        if !report.is_empty() {
            tracing::debug!(
                operation = %operation,
                total = report.len(),
                failed = report.failed(),
                "Batch complete"
            );
        }
        report
    }

    fn apply(&self, operation: Operation, unit: Unit) -> UnitOutcome {
        let Some(handler) = self.handler(&unit.unit_type) else {
            let message = format!("No handler registered for unit type {}", unit.unit_type);
            tracing::warn!(
                operation = %operation,
                unit_type = %unit.unit_type,
                key = %unit.key,
                "No handler registered for unit"
            );
            return self.record(operation, unit, Err(message));
        };

        self.fire(
            operation.before_event(),
            Lifecycle::new(unit.clone(), operation, LifecycleState::Pending),
        );

        let result = invoke(handler.as_ref(), operation, &unit).map_err(|e| {
            tracing::warn!(
                operation = %operation,
                handler = handler.name(),
                unit_type = %unit.unit_type,
                key = %unit.key,
                error = %e,
                "Handler operation failed"
            );
            e.to_string()
        });

        self.record(operation, unit, result)
    }

    /// Apply the outcome to the tracker and fire the after-event.
    fn record(
        &self,
        operation: Operation,
        unit: Unit,
        result: std::result::Result<(), String>,
    ) -> UnitOutcome {
        let (state, message) = match result {
            Ok(()) => (LifecycleState::Successful, None),
            Err(message) => (LifecycleState::Failed, Some(message)),
        };

        match (operation, state) {
            (Operation::Undeploy, _) => {
                self.tracker.remove(&unit.unit_type, &unit.key);
            }
            (_, LifecycleState::Successful) => self.tracker.mark_deployed(unit.clone()),
            _ => self.tracker.mark_faulty(unit.clone()),
        }

        if state == LifecycleState::Successful {
            tracing::info!(
                operation = %operation,
                unit_type = %unit.unit_type,
                key = %unit.key,
                "Unit operation succeeded"
            );
        }

        let outcome = UnitOutcome {
            unit_type: unit.unit_type.clone(),
            key: unit.key.clone(),
            operation,
            state,
            message: message.clone(),
        };

        let mut lifecycle = Lifecycle::new(unit, operation, state);
        if let Some(message) = message {
            lifecycle = lifecycle.with_message(message);
        }
        self.fire(operation.after_event(), lifecycle);

        outcome
    }

    fn fire(&self, event_type: LifecycleEventType, lifecycle: Lifecycle) {
        self.notifier
            .notify(&LifecycleEvent::new(event_type, lifecycle));
    }
}

fn invoke(
    handler: &dyn Handler,
    operation: Operation,
    unit: &Unit,
) -> std::result::Result<(), OperationError> {
    match operation {
        Operation::Deploy => handler.deploy(unit),
        Operation::Update => handler.update(unit),
        Operation::Undeploy => handler.undeploy(&unit.key),
    }
}

/// Create a handler's resolved directory and call `init`.
fn activate(root: &NormalizedPath, handler: &dyn Handler, directory: NormalizedPath) -> Result<()> {
    let native = directory.to_native();
    fs::create_dir_all(&native).map_err(|e| deploy_fs::Error::io(&native, e))?;

    let context = HandlerContext {
        repository: root.clone(),
        directory: directory.clone(),
    };
    handler
        .init(&context)
        .map_err(|source| RegistrationError::InitFailed {
            handler: handler.name().to_string(),
            source,
        })?;

    tracing::debug!(
        handler = handler.name(),
        directory = %directory,
        "Activated handler"
    );
    Ok(())
}

pub(crate) fn resolve_handler_location(
    root: &NormalizedPath,
    handler: &dyn Handler,
) -> Result<NormalizedPath> {
    resolve_location(root, handler.location()).map_err(|e| match e {
        deploy_fs::Error::UnsupportedScheme { location, .. } => Error::UnsupportedLocation {
            handler: handler.name().to_string(),
            location,
        },
        other => Error::Fs(other),
    })
}
