//! Modification-time detection for repository entries

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use crate::{Error, Result};

/// Last modification time of `path` in milliseconds since the Unix epoch.
///
/// For a directory this is the newest modification time of the directory
/// itself or anything beneath it, so editing a file inside an exploded
/// artifact counts as modifying the artifact.
///
/// Only `path` itself must be readable. Symlinks below it are not followed,
/// and nested entries that cannot be read are skipped with a warning.
pub fn last_modified(path: &Path) -> Result<i64> {
    let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
    let mut newest = to_millis(metadata.modified().map_err(|e| Error::io(path, e))?);
    if !metadata.is_dir() {
        return Ok(newest);
    }

    for entry in WalkDir::new(path).follow_links(false).min_depth(1) {
        let modified = entry
            .and_then(|entry| entry.metadata())
            .map_err(std::io::Error::from)
            .and_then(|metadata| metadata.modified());
        match modified {
            Ok(modified) => newest = newest.max(to_millis(modified)),
            Err(e) => {
                tracing::warn!(root = %path.display(), error = %e, "Skipping unreadable entry");
            }
        }
    }

    Ok(newest)
}

fn to_millis(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp_millis()
}
