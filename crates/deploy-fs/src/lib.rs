//! Filesystem helpers for the deployment engine
//!
//! Provides normalized paths, handler location resolution, atomic copy and
//! removal of artifacts, and modification-time detection for repository scans.

pub mod config;
pub mod error;
pub mod io;
pub mod location;
pub mod modified;
pub mod path;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use location::resolve_location;
pub use modified::last_modified;
pub use path::NormalizedPath;
