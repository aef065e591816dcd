//! Path normalization utilities for cross-platform file handling.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::AnatomistError;

/// Normalizes a file path to a canonical UTF-8 string with forward slashes.
///
/// # Errors
/// - `AnatomistError::IoError` if canonicalization fails (file not found, permissions, etc.)
/// - `AnatomistError::ParseFailure` if the path contains non-UTF-8 characters
pub fn normalize_path(path: &Path) -> Result<String, AnatomistError> {
    let canonical = dunce::canonicalize(path)?;
    let s = canonical.to_str().ok_or_else(|| {
        AnatomistError::ParseFailure(format!("Non-UTF-8 path: {}", canonical.display()))
    })?;
    Ok(s.replace('\\', "/"))
}

/// Renders `path` relative to `root` with forward slashes.
///
/// Falls back to the full (lossy) path when `path` is not under `root`.
///
/// # Example
/// ```
/// use std::path::Path;
/// use anatomist::path_util::relative_display;
///
/// let rel = relative_display(Path::new("/repo"), Path::new("/repo/src/Foo.java"));
/// assert_eq!(rel, "src/Foo.java");
/// ```
pub fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Returns `true` for `.java` files.
pub fn is_java_source(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("java")
}

/// Directory names never descended into when collecting sources.
const SKIPPED_DIRS: &[&str] = &["target", "build", "out", "bin", "node_modules"];

/// Returns `true` for hidden and build-output directories.
pub fn is_skipped_dir(name: &str) -> bool {
    (name.starts_with('.') && name != "." && name != "..") || SKIPPED_DIRS.contains(&name)
}

/// Every `.java` file under `root` in sorted path order.
///
/// Hidden and build-output directories are pruned. A `root` that is itself a
/// Java file yields just that file.
///
/// # Errors
/// `AnatomistError::WalkError` if `root` cannot be read.
pub fn java_sources(root: &Path) -> Result<Vec<PathBuf>, AnatomistError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !is_skipped_dir(&e.file_name().to_string_lossy())
        });
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_java_source(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_cargo_manifest() {
        let cargo_manifest = std::env::var("CARGO_MANIFEST_DIR")
            .map(|dir| Path::new(&dir).join("Cargo.toml"))
            .unwrap();

        let normalized = normalize_path(&cargo_manifest).unwrap();
        assert!(normalized.contains('/'));
        assert!(normalized.ends_with("Cargo.toml"));
        assert!(!normalized.contains('\\'));
    }

    #[test]
    fn test_normalize_nonexistent_path() {
        let result = normalize_path(Path::new("/this/does/not/exist/Nowhere.java"));
        assert!(result.is_err());
    }

    #[test]
    fn test_relative_display_outside_root() {
        let rel = relative_display(Path::new("/a"), Path::new("/b/C.java"));
        assert_eq!(rel, "/b/C.java");
    }

    #[test]
    fn test_source_and_dir_filters() {
        assert!(is_java_source(Path::new("src/Foo.java")));
        assert!(!is_java_source(Path::new("src/Foo.kt")));
        assert!(is_skipped_dir(".git"));
        assert!(is_skipped_dir("target"));
        assert!(!is_skipped_dir("src"));
    }

    #[test]
    fn test_java_sources_sorted_and_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("b")).unwrap();
        std::fs::create_dir_all(dir.path().join("target")).unwrap();
        std::fs::write(src.join("b/Z.java"), "class Z {}").unwrap();
        std::fs::write(src.join("A.java"), "class A {}").unwrap();
        std::fs::write(src.join("notes.txt"), "").unwrap();
        std::fs::write(dir.path().join("target/Gen.java"), "class Gen {}").unwrap();

        let files = java_sources(dir.path()).unwrap();
        let rel: Vec<_> = files.iter().map(|f| relative_display(dir.path(), f)).collect();
        assert_eq!(rel, vec!["src/A.java", "src/b/Z.java"]);
    }

    #[test]
    fn test_java_sources_missing_root() {
        assert!(matches!(
            java_sources(Path::new("/this/does/not/exist")),
            Err(AnatomistError::WalkError(_))
        ));
    }
}
