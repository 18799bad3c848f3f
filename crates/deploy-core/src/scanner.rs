//! Repository scanner
//!
//! Each cycle diffs the handler directories against the engine's tracked
//! units (mark) and then drives the engine (sweep):
//!
//! 1. `update_units(to_update)`
//! 2. `undeploy_units(to_undeploy)`
//! 3. `deploy_units(to_deploy)`
//!
//! Updates settle in-place changes before removals, and removals run before
//! new units are admitted. Only one cycle runs at a time: a [`ScanCycle`]
//! holds the scanner's cycle lock for as long as it lives.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use deploy_fs::{NormalizedPath, io, last_modified};
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::Serialize;

use crate::engine::{BatchReport, DeploymentEngine, resolve_handler_location};
use crate::error::{Error, Result};
use crate::tracker::{TrackedState, TrackedUnit};
use crate::unit::{Unit, UnitType};

/// Where the scanner is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanPhase {
    Idle,
    Marking,
    Sweeping,
}

/// Work produced by the mark phase.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WorkLists {
    pub to_deploy: Vec<Unit>,
    pub to_update: Vec<Unit>,
    pub to_undeploy: Vec<Unit>,
}

impl WorkLists {
    pub fn is_empty(&self) -> bool {
        self.to_deploy.is_empty() && self.to_update.is_empty() && self.to_undeploy.is_empty()
    }

    fn clear(&mut self) {
        self.to_deploy.clear();
        self.to_update.clear();
        self.to_undeploy.clear();
    }
}

/// Sizes of the work lists built by one mark phase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkSummary {
    pub to_deploy: usize,
    pub to_update: usize,
    pub to_undeploy: usize,
}

/// Engine results of one sweep phase, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub updated: BatchReport,
    pub undeployed: BatchReport,
    pub deployed: BatchReport,
}

impl SweepReport {
    /// Number of handler dispatches attempted.
    pub fn dispatched(&self) -> usize {
        self.updated.len() + self.undeployed.len() + self.deployed.len()
    }
}

/// Result of a full mark-and-sweep cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub marked: MarkSummary,
    pub swept: SweepReport,
}

/// Periodic reconciler between handler directories and the engine.
pub struct RepositoryScanner {
    engine: Arc<DeploymentEngine>,
    retry_faulty: bool,
    lists: Mutex<WorkLists>,
    phase: RwLock<ScanPhase>,
}

impl RepositoryScanner {
    pub fn new(engine: Arc<DeploymentEngine>) -> Self {
        Self {
            engine,
            retry_faulty: true,
            lists: Mutex::new(WorkLists::default()),
            phase: RwLock::new(ScanPhase::Idle),
        }
    }

    /// Whether unchanged faulty units are re-deployed on every scan.
    pub fn with_retry_faulty(mut self, retry_faulty: bool) -> Self {
        self.retry_faulty = retry_faulty;
        self
    }

    pub fn engine(&self) -> &Arc<DeploymentEngine> {
        &self.engine
    }

    pub fn phase(&self) -> ScanPhase {
        *self.phase.read()
    }

    /// Begin a cycle, waiting for any running cycle to finish.
    pub fn begin(&self) -> ScanCycle<'_> {
        ScanCycle {
            scanner: self,
            lists: self.lists.lock(),
        }
    }

    /// Begin a cycle unless one is already running.
    pub fn try_begin(&self) -> Option<ScanCycle<'_>> {
        self.lists.try_lock().map(|lists| ScanCycle {
            scanner: self,
            lists,
        })
    }

    /// Run one full cycle, waiting for a running cycle first.
    pub fn scan(&self) -> Result<ScanReport> {
        self.begin().run()
    }

    /// Run one full cycle, or return `None` if a cycle is already running.
    pub fn try_scan(&self) -> Option<Result<ScanReport>> {
        self.try_begin().map(ScanCycle::run)
    }

    fn set_phase(&self, phase: ScanPhase) {
        *self.phase.write() = phase;
    }
}

/// Exclusive access to the scanner for one mark-and-sweep cycle.
pub struct ScanCycle<'a> {
    scanner: &'a RepositoryScanner,
    lists: MutexGuard<'a, WorkLists>,
}

impl ScanCycle<'_> {
    /// Work lists produced by the last mark phase and not yet swept.
    pub fn pending(&self) -> &WorkLists {
        &self.lists
    }

    /// Diff every handler directory against the tracked units.
    ///
    /// # Errors
    ///
    /// [`Error::NotStarted`] if the engine has no repository yet.
    pub fn mark(&mut self) -> Result<MarkSummary> {
        let engine = Arc::clone(&self.scanner.engine);
        let root = engine.repository().ok_or(Error::NotStarted)?.clone();

        self.scanner.set_phase(ScanPhase::Marking);
        self.lists.clear();

        let tracked = tracked_by_path(engine.tracker().tracked_units());
        let mut seen: HashSet<(UnitType, NormalizedPath)> = HashSet::new();
        // Types whose directory could not be listed keep their units as-is
        let mut unreadable: HashSet<UnitType> = HashSet::new();

        for handler in engine.handlers() {
            let unit_type = handler.unit_type().clone();
            let entries = resolve_handler_location(&root, handler.as_ref()).and_then(|dir| {
                io::list_entries(&dir.to_native()).map_err(Error::from)
            });
            let entries = match entries {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        handler = handler.name(),
                        unit_type = %unit_type,
                        error = %e,
                        "Cannot list handler directory, skipping"
                    );
                    unreadable.insert(unit_type);
                    continue;
                }
            };

            for entry in entries {
                let path = NormalizedPath::new(&entry);
                let identity = (unit_type.clone(), path.clone());
                let modified = match last_modified(&entry) {
                    Ok(modified) => modified,
                    Err(e) if entry.symlink_metadata().is_ok() => {
                        // Present but unreadable; leave any tracked unit as it is
                        tracing::warn!(path = %path, error = %e, "Cannot stat entry, keeping state");
                        seen.insert(identity);
                        continue;
                    }
                    Err(e) => {
                        // Vanished between listing and stat; treated as absent
                        tracing::debug!(path = %path, error = %e, "Skipping entry");
                        continue;
                    }
                };

                match tracked.get(&identity) {
                    None => {
                        let unit = Unit::new(path, unit_type.clone()).with_last_modified(modified);
                        self.lists.to_deploy.push(unit);
                    }
                    Some(existing) if existing.unit.last_modified_time != modified => {
                        engine.tracker().set_last_modified(
                            &existing.unit.unit_type,
                            &existing.unit.key,
                            modified,
                        );
                        let mut unit = existing.unit.clone();
                        unit.last_modified_time = modified;
                        self.lists.to_update.push(unit);
                    }
                    Some(existing)
                        if existing.state == TrackedState::Faulty && self.scanner.retry_faulty =>
                    {
                        self.lists.to_deploy.push(existing.unit.clone());
                    }
                    Some(_) => {}
                }

                seen.insert(identity);
            }
        }

        for ((unit_type, path), existing) in tracked {
            if unreadable.contains(&unit_type) || seen.contains(&(unit_type, path)) {
                continue;
            }
            self.lists.to_undeploy.push(existing.unit);
        }
        // Deterministic order for handlers and logs
        self.lists.to_undeploy.sort_by(|a, b| a.path.cmp(&b.path));

        let summary = MarkSummary {
            to_deploy: self.lists.to_deploy.len(),
            to_update: self.lists.to_update.len(),
            to_undeploy: self.lists.to_undeploy.len(),
        };
        tracing::debug!(
            to_deploy = summary.to_deploy,
            to_update = summary.to_update,
            to_undeploy = summary.to_undeploy,
            "Mark phase complete"
        );
        Ok(summary)
    }

    /// Run the work lists through the engine: update, undeploy, deploy.
    ///
    /// Each list is emptied when its phase runs.
    pub fn sweep(&mut self) -> SweepReport {
        let engine = Arc::clone(&self.scanner.engine);
        self.scanner.set_phase(ScanPhase::Sweeping);

        let updated = engine.update_units(std::mem::take(&mut self.lists.to_update));
        let undeployed = engine.undeploy_units(std::mem::take(&mut self.lists.to_undeploy));
        let deployed = engine.deploy_units(std::mem::take(&mut self.lists.to_deploy));

        self.scanner.set_phase(ScanPhase::Idle);
        SweepReport {
            updated,
            undeployed,
            deployed,
        }
    }

    fn run(mut self) -> Result<ScanReport> {
        let marked = self.mark()?;
        let swept = self.sweep();
        if swept.dispatched() > 0 {
            tracing::info!(
                updated = swept.updated.len(),
                undeployed = swept.undeployed.len(),
                deployed = swept.deployed.len(),
                failed = swept.updated.failed() + swept.undeployed.failed() + swept.deployed.failed(),
                "Repository scan applied changes"
            );
        }
        Ok(ScanReport { marked, swept })
    }
}

impl Drop for ScanCycle<'_> {
    fn drop(&mut self) {
        self.scanner.set_phase(ScanPhase::Idle);
    }
}

fn tracked_by_path(tracked: Vec<TrackedUnit>) -> HashMap<(UnitType, NormalizedPath), TrackedUnit> {
    tracked
        .into_iter()
        .map(|t| ((t.unit.unit_type.clone(), t.unit.path.clone()), t))
        .collect()
}
