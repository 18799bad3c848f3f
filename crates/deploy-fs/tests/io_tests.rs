use deploy_fs::{Error, NormalizedPath, io};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_write_atomic_creates_file_and_parents() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("nested/dir/test.txt"));

    io::write_atomic(&path, b"hello world").unwrap();

    let content = fs::read_to_string(path.to_native()).unwrap();
    assert_eq!(content, "hello world");
}

#[test]
fn test_write_atomic_leaves_no_staging_file() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("test.txt"));

    io::write_atomic(&path, b"one").unwrap();
    io::write_atomic(&path, b"two").unwrap();

    let names: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["test.txt".to_string()]);
    assert_eq!(io::read_text(&path).unwrap(), "two");
}

#[test]
fn test_copy_atomic_file_into_directory() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("sample1.txt");
    fs::write(&source, "payload").unwrap();
    let dest = NormalizedPath::new(temp.path().join("repo/text-files"));

    let copied = io::copy_atomic(&source, &dest).unwrap();

    assert_eq!(copied, dest.join("sample1.txt"));
    assert_eq!(fs::read_to_string(copied.to_native()).unwrap(), "payload");
    assert!(source.exists(), "source must be left in place");
}

#[test]
fn test_copy_atomic_replaces_existing_target() {
    let temp = TempDir::new().unwrap();
    let dest = NormalizedPath::new(temp.path().join("repo"));
    fs::create_dir_all(dest.to_native()).unwrap();
    fs::write(dest.join("a.txt").to_native(), "old").unwrap();

    let source = temp.path().join("a.txt");
    fs::write(&source, "new").unwrap();
    io::copy_atomic(&source, &dest).unwrap();

    assert_eq!(fs::read_to_string(dest.join("a.txt").to_native()).unwrap(), "new");
    assert_eq!(names_in(&dest.to_native()), vec!["a.txt".to_string()]);
}

#[test]
fn test_copy_atomic_directory_tree() {
    let temp = TempDir::new().unwrap();
    let app = temp.path().join("shop");
    fs::create_dir_all(app.join("WEB-INF/lib")).unwrap();
    fs::write(app.join("index.html"), "<html/>").unwrap();
    fs::write(app.join("WEB-INF/lib/core.jar"), "jar").unwrap();
    let dest = NormalizedPath::new(temp.path().join("repo/webapps"));

    let copied = io::copy_atomic(&app, &dest).unwrap();

    assert!(copied.is_dir());
    assert_eq!(
        fs::read_to_string(copied.join("WEB-INF/lib/core.jar").to_native()).unwrap(),
        "jar"
    );
}

fn names_in(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn test_copy_atomic_replaces_directory_without_leftovers() {
    let temp = TempDir::new().unwrap();
    let dest = NormalizedPath::new(temp.path().join("repo/webapps"));
    let old = dest.join("shop").to_native();
    fs::create_dir_all(old.join("WEB-INF")).unwrap();
    fs::write(old.join("WEB-INF/old.xml"), "old").unwrap();
    fs::write(old.join("index.html"), "old").unwrap();

    let app = temp.path().join("staging/shop");
    fs::create_dir_all(&app).unwrap();
    fs::write(app.join("index.html"), "new").unwrap();
    let copied = io::copy_atomic(&app, &dest).unwrap();

    assert_eq!(fs::read_to_string(copied.join("index.html").to_native()).unwrap(), "new");
    assert!(!copied.join("WEB-INF").exists());
    assert_eq!(names_in(&dest.to_native()), vec!["shop".to_string()]);
}

#[test]
fn test_copy_atomic_replaces_file_with_directory() {
    let temp = TempDir::new().unwrap();
    let dest = NormalizedPath::new(temp.path().join("repo"));
    fs::create_dir_all(dest.to_native()).unwrap();
    fs::write(dest.join("shop").to_native(), "was a file").unwrap();

    let app = temp.path().join("shop");
    fs::create_dir_all(&app).unwrap();
    fs::write(app.join("index.html"), "<html/>").unwrap();
    let copied = io::copy_atomic(&app, &dest).unwrap();

    assert!(copied.is_dir());
    assert_eq!(names_in(&dest.to_native()), vec!["shop".to_string()]);
}

#[test]
fn test_copy_atomic_missing_source() {
    let temp = TempDir::new().unwrap();
    let dest = NormalizedPath::new(temp.path().join("repo"));
    let err = io::copy_atomic(&temp.path().join("missing.txt"), &dest).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn test_remove_tree_file_and_directory() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("a.txt");
    fs::write(&file, "a").unwrap();
    let dir = temp.path().join("app");
    fs::create_dir_all(dir.join("inner")).unwrap();
    fs::write(dir.join("inner/b.txt"), "b").unwrap();

    io::remove_tree(&file).unwrap();
    io::remove_tree(&dir).unwrap();

    assert!(!file.exists());
    assert!(!dir.exists());
    assert!(io::remove_tree(&file).is_err());
}

#[test]
fn test_list_entries_skips_hidden_and_sorts() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("b.txt"), "b").unwrap();
    fs::write(temp.path().join("a.txt"), "a").unwrap();
    fs::write(temp.path().join(".a.txt.42.tmp"), "staging").unwrap();
    fs::create_dir(temp.path().join("c")).unwrap();

    let entries = io::list_entries(temp.path()).unwrap();
    let names: Vec<_> = entries
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();

    assert_eq!(names, vec!["a.txt", "b.txt", "c"]);
}

#[test]
fn test_list_entries_missing_directory_is_empty() {
    let temp = TempDir::new().unwrap();
    let entries = io::list_entries(&temp.path().join("nope")).unwrap();
    assert!(entries.is_empty());
}

#[cfg(target_os = "linux")]
#[test]
fn test_list_entries_skips_non_utf8_names() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.txt"), "a").unwrap();
    fs::write(temp.path().join(OsStr::from_bytes(b"bad\xff.txt")), "x").unwrap();

    let entries = io::list_entries(temp.path()).unwrap();

    assert_eq!(entries, vec![temp.path().join("a.txt")]);
}
