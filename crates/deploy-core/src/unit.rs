//! Deployable units and their type tags

use std::collections::HashMap;
use std::fmt;

use deploy_fs::NormalizedPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version assigned to units discovered on disk.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Identifier distinguishing classes of deployable content (`"txt"`,
/// `"webapp"`). A blank identifier counts as missing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitType(String);

impl UnitType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the tag is empty or whitespace only.
    pub fn is_nil(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for UnitType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A deployable item found in a handler's directory.
///
/// The engine tracks units by `(unit_type, key)`; repository scans match
/// them against the disk by `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Location of the artifact (file or exploded directory)
    pub path: NormalizedPath,
    /// Tracking key, the artifact's file name for discovered units
    pub key: String,
    pub unit_type: UnitType,
    pub version: String,
    /// Modification time recorded at the last scan, in ms since the epoch
    pub last_modified_time: i64,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

impl Unit {
    /// Create a unit for the artifact at `path`, keyed by its file name.
    pub fn new(path: impl Into<NormalizedPath>, unit_type: impl Into<UnitType>) -> Self {
        let path = path.into();
        let key = path.file_name().unwrap_or(path.as_str()).to_string();
        Self {
            path,
            key,
            unit_type: unit_type.into(),
            version: DEFAULT_VERSION.to_string(),
            last_modified_time: 0,
            properties: HashMap::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_last_modified(mut self, millis: i64) -> Self {
        self.last_modified_time = millis;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}
