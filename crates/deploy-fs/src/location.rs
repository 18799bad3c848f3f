//! Handler location resolution
//!
//! Handlers declare where their artifacts live either as a plain path or as
//! a `file:` URL. Relative locations are resolved under the repository root.

use std::path::Path;

use crate::{Error, NormalizedPath, Result};

const FILE_SCHEME: &str = "file";

/// Resolve a handler location against the repository root.
///
/// - `file:` URLs are stripped of their scheme (`file:///srv/apps` becomes
///   `/srv/apps`, `file:apps` becomes `apps`).
/// - Absolute paths are returned as-is.
/// - Relative paths are joined onto `root`.
///
/// Locations are declared by handlers rather than read from disk, so either
/// separator is accepted on every platform.
///
/// Any other URL scheme is rejected with [`Error::UnsupportedScheme`].
pub fn resolve_location(root: &NormalizedPath, location: &str) -> Result<NormalizedPath> {
    let location = location.trim();

    let stripped = match split_scheme(location) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case(FILE_SCHEME) => strip_authority(rest),
        Some((scheme, _)) => {
            return Err(Error::UnsupportedScheme {
                location: location.to_string(),
                scheme: scheme.to_string(),
            });
        }
        None => location,
    };
    let stripped = stripped.replace('\\', "/");

    if is_absolute(&stripped) {
        Ok(NormalizedPath::new(stripped))
    } else {
        Ok(root.join(&stripped))
    }
}

/// Split `scheme:rest` when `location` starts with a URL scheme.
///
/// Single-letter schemes are not treated as URLs so that Windows drive
/// letters (`C:\deploy`) pass through untouched.
fn split_scheme(location: &str) -> Option<(&str, &str)> {
    let idx = location.find(':')?;
    let scheme = &location[..idx];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if scheme.len() < 2 || !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    Some((scheme, &location[idx + 1..]))
}

/// `//host/path` and `///path` forms of a file URL, minus the authority.
fn strip_authority(rest: &str) -> &str {
    let Some(after) = rest.strip_prefix("//") else {
        return rest;
    };
    let after = after.strip_prefix("localhost").unwrap_or(after);
    // file:///C:/deploy -> C:/deploy
    let bytes = after.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
        return &after[1..];
    }
    after
}

fn is_absolute(location: &str) -> bool {
    if location.starts_with('/') || location.starts_with('\\') {
        return true;
    }
    let bytes = location.as_bytes();
    (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
        || Path::new(location).is_absolute()
}
