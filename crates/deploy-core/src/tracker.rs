//! Deployed and faulty unit tracking
//!
//! Two parallel maps `unit type -> key -> Unit`. A key lives in at most one
//! of them at a time. Readers get cloned snapshots; writes happen through
//! the engine.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::unit::{Unit, UnitType};

/// Units grouped by type, then by key.
pub type UnitMap = HashMap<UnitType, HashMap<String, Unit>>;

/// Which set a tracked unit currently belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedState {
    Deployed,
    Faulty,
}

/// A tracked unit together with the set it was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedUnit {
    pub unit: Unit,
    pub state: TrackedState,
}

#[derive(Default)]
struct TrackedSets {
    deployed: UnitMap,
    faulty: UnitMap,
}

/// Thread-safe deployed/faulty sets.
#[derive(Default)]
pub struct UnitTracker {
    sets: RwLock<TrackedSets>,
}

impl UnitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful deployment, clearing any faulty entry.
    pub(crate) fn mark_deployed(&self, unit: Unit) {
        let mut sets = self.sets.write();
        remove_from(&mut sets.faulty, &unit.unit_type, &unit.key);
        insert_into(&mut sets.deployed, unit);
    }

    /// Record a failed unit, moving it out of the deployed set.
    pub(crate) fn mark_faulty(&self, unit: Unit) {
        let mut sets = self.sets.write();
        remove_from(&mut sets.deployed, &unit.unit_type, &unit.key);
        insert_into(&mut sets.faulty, unit);
    }

    /// Drop a unit from both sets, returning whichever entry existed.
    pub(crate) fn remove(&self, unit_type: &UnitType, key: &str) -> Option<Unit> {
        let mut sets = self.sets.write();
        let deployed = remove_from(&mut sets.deployed, unit_type, key);
        let faulty = remove_from(&mut sets.faulty, unit_type, key);
        deployed.or(faulty)
    }

    /// Update the recorded modification time of a tracked unit.
    ///
    /// Returns false when the unit is not tracked.
    pub(crate) fn set_last_modified(&self, unit_type: &UnitType, key: &str, millis: i64) -> bool {
        let mut sets = self.sets.write();
        let TrackedSets { deployed, faulty } = &mut *sets;
        for map in [deployed, faulty] {
            if let Some(unit) = map.get_mut(unit_type).and_then(|units| units.get_mut(key)) {
                unit.last_modified_time = millis;
                return true;
            }
        }
        false
    }

    pub fn deployed(&self, unit_type: &UnitType, key: &str) -> Option<Unit> {
        let sets = self.sets.read();
        sets.deployed.get(unit_type)?.get(key).cloned()
    }

    pub fn faulty(&self, unit_type: &UnitType, key: &str) -> Option<Unit> {
        let sets = self.sets.read();
        sets.faulty.get(unit_type)?.get(key).cloned()
    }

    pub fn deployed_units(&self) -> UnitMap {
        self.sets.read().deployed.clone()
    }

    pub fn faulty_units(&self) -> UnitMap {
        self.sets.read().faulty.clone()
    }

    /// Every tracked unit, deployed first, then faulty.
    pub fn tracked_units(&self) -> Vec<TrackedUnit> {
        let sets = self.sets.read();
        let deployed = sets.deployed.values().flat_map(|units| units.values()).map(|unit| {
            TrackedUnit {
                unit: unit.clone(),
                state: TrackedState::Deployed,
            }
        });
        let faulty = sets.faulty.values().flat_map(|units| units.values()).map(|unit| {
            TrackedUnit {
                unit: unit.clone(),
                state: TrackedState::Faulty,
            }
        });
        deployed.chain(faulty).collect()
    }

    /// Number of deployed and faulty units.
    pub fn counts(&self) -> (usize, usize) {
        let sets = self.sets.read();
        (count(&sets.deployed), count(&sets.faulty))
    }
}

fn insert_into(map: &mut UnitMap, unit: Unit) {
    map.entry(unit.unit_type.clone())
        .or_default()
        .insert(unit.key.clone(), unit);
}

fn remove_from(map: &mut UnitMap, unit_type: &UnitType, key: &str) -> Option<Unit> {
    let units = map.get_mut(unit_type)?;
    let removed = units.remove(key);
    if units.is_empty() {
        map.remove(unit_type);
    }
    removed
}

fn count(map: &UnitMap) -> usize {
    map.values().map(HashMap::len).sum()
}
