//! [`TestRepository`] builder for deployment test scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

/// A temporary repository root with helpers to add, modify and remove
/// artifacts under handler directories.
///
/// # Example
///
/// ```rust,no_run
/// use deploy_test_utils::TestRepository;
///
/// let repo = TestRepository::new();
/// repo.write("text-files/sample1.txt", "hello");
/// repo.touch("text-files/sample1.txt");
/// repo.remove("text-files/sample1.txt");
/// ```
pub struct TestRepository {
    temp_dir: TempDir,
}

impl Default for TestRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRepository {
    /// Create an empty temporary repository.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the repository.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `relative` under the root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write a file, creating parent directories as needed.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Create a directory (and parents).
    pub fn mkdir(&self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Move the modification time of a file forward.
    pub fn touch(&self, relative: &str) {
        touch(&self.path(relative));
    }

    /// Remove a file or directory tree.
    pub fn remove(&self, relative: &str) {
        let path = self.path(relative);
        if path.is_dir() {
            fs::remove_dir_all(&path).unwrap();
        } else {
            fs::remove_file(&path).unwrap();
        }
    }

    /// Assert that `relative` exists under the root.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_exists(&self, relative: &str) {
        let full_path = self.path(relative);
        assert!(
            full_path.exists(),
            "Expected path to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `relative` does **not** exist under the root.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_not_exists(&self, relative: &str) {
        let full_path = self.path(relative);
        assert!(
            !full_path.exists(),
            "Expected path NOT to exist: {}",
            full_path.display()
        );
    }
}

/// Move the modification time of the file at `path` two seconds past its
/// current value, so the change is visible regardless of filesystem
/// timestamp resolution.
pub fn touch(path: &Path) {
    let current = fs::metadata(path).unwrap().modified().unwrap();
    let later = current + Duration::from_secs(2);
    let file = fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(later.max(SystemTime::now())).unwrap();
}
