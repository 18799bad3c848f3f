//! Atomic I/O operations with file locking
//!
//! Artifacts are staged under a hidden temp name in the destination
//! directory and renamed into place, so a repository scan never sees a
//! partially copied unit.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use walkdir::WalkDir;

use crate::{Error, NormalizedPath, Result};

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename strategy to prevent partial writes.
/// Acquires an advisory lock to prevent concurrent access.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_path = staging_path(&native_path);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .lock_exclusive()
        .map_err(|_| Error::LockFailed {
            path: native_path.clone(),
        })?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    fs::rename(&temp_path, &native_path).map_err(|e| Error::io(&native_path, e))?;

    Ok(())
}

/// Copy a file or directory tree into `dest_dir`, keeping its file name.
///
/// The copy is staged next to the destination and renamed into place.
/// Returns the final path of the copied artifact.
pub fn copy_atomic(source: &Path, dest_dir: &NormalizedPath) -> Result<NormalizedPath> {
    let file_name = source
        .file_name()
        .ok_or_else(|| {
            Error::io(
                source,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "source has no file name"),
            )
        })?
        .to_owned();

    let dest_native = dest_dir.to_native();
    fs::create_dir_all(&dest_native).map_err(|e| Error::io(&dest_native, e))?;

    let target = dest_native.join(&file_name);
    let staging = staging_path(&target);

    let metadata = fs::metadata(source).map_err(|e| Error::io(source, e))?;
    let staged = if metadata.is_dir() {
        copy_tree(source, &staging)
    } else {
        copy_file_locked(source, &staging)
    };
    if let Err(e) = staged {
        let _ = remove_tree(&staging);
        return Err(e);
    }

    if let Err(e) = replace_with(&staging, &target) {
        let _ = remove_tree(&staging);
        return Err(e);
    }

    tracing::debug!(source = %source.display(), target = %target.display(), "Copied artifact");
    Ok(NormalizedPath::new(target))
}

/// Move `staged` onto `target`, replacing whatever is there.
///
/// A file over a file is a single rename. When a directory is involved the
/// old target is first renamed to a hidden backup name, so the target path
/// only ever holds the complete old or complete new artifact.
fn replace_with(staged: &Path, target: &Path) -> Result<()> {
    let existing = match fs::symlink_metadata(target) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return fs::rename(staged, target).map_err(|e| Error::io(target, e));
        }
        Err(e) => return Err(Error::io(target, e)),
    };
    let staged_is_dir = fs::symlink_metadata(staged)
        .map_err(|e| Error::io(staged, e))?
        .is_dir();
    if !existing.is_dir() && !staged_is_dir {
        return fs::rename(staged, target).map_err(|e| Error::io(target, e));
    }

    let backup = backup_path(target);
    if fs::symlink_metadata(&backup).is_ok() {
        remove_tree(&backup)?;
    }
    fs::rename(target, &backup).map_err(|e| Error::io(target, e))?;
    if let Err(e) = fs::rename(staged, target) {
        if let Err(restore) = fs::rename(&backup, target) {
            tracing::error!(
                path = %target.display(),
                backup = %backup.display(),
                error = %restore,
                "Failed to restore previous artifact"
            );
        }
        return Err(Error::io(target, e));
    }
    if let Err(e) = remove_tree(&backup) {
        tracing::warn!(backup = %backup.display(), error = %e, "Failed to remove replaced artifact");
    }
    Ok(())
}

/// Remove a file or a whole directory tree.
pub fn remove_tree(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path).map_err(|e| Error::io(path, e))?;
    if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(|e| Error::io(path, e))
    } else {
        fs::remove_file(path).map_err(|e| Error::io(path, e))
    }
}

/// List the entries directly under `dir`, sorted by path.
///
/// Hidden entries (names starting with `.`) are skipped; they include the
/// staging names used by [`copy_atomic`]. Names that are not valid UTF-8
/// cannot be keyed and are skipped with a warning. A missing directory
/// yields an empty listing.
pub fn list_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(dir, e)),
    };

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            tracing::warn!(path = %entry.path().display(), "Skipping entry with non-UTF-8 name");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

fn staging_path(target: &Path) -> PathBuf {
    hidden_sibling(target, "tmp")
}

fn backup_path(target: &Path) -> PathBuf {
    hidden_sibling(target, "old")
}

fn hidden_sibling(target: &Path, suffix: &str) -> PathBuf {
    let name = format!(
        ".{}.{}.{suffix}",
        target
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    target.with_file_name(name)
}

fn copy_file_locked(source: &Path, dest: &Path) -> Result<()> {
    let mut reader = fs::File::open(source).map_err(|e| Error::io(source, e))?;
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(dest)
        .map_err(|e| Error::io(dest, e))?;
    file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: dest.to_path_buf(),
    })?;

    std::io::copy(&mut reader, &mut file).map_err(|e| Error::io(dest, e))?;
    file.sync_all().map_err(|e| Error::io(dest, e))?;

    file.unlock().map_err(|_| Error::LockFailed {
        path: dest.to_path_buf(),
    })?;
    Ok(())
}

fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            Error::io(path, e.into())
        })?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let to = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&to).map_err(|e| Error::io(&to, e))?;
        } else {
            fs::copy(entry.path(), &to).map_err(|e| Error::io(entry.path(), e))?;
        }
    }
    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Write text content to a file atomically.
pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}
