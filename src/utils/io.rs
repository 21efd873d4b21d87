//! File I/O primitives with consistent error handling.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Read file contents with standardized error handling.
///
/// Wraps `fs::read_to_string` with consistent `Error::internal_io` formatting.
pub fn read_file(path: &Path, operation: &str) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Remove a file, treating "already gone" as success.
pub fn remove_file_if_exists(path: &Path, operation: &str) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::internal_io(e.to_string(), Some(operation.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn read_file_succeeds_for_existing_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "WP_HOME=http://example.test").unwrap();

        let content = read_file(temp.path(), "test read").unwrap();
        assert!(content.contains("WP_HOME"));
    }

    #[test]
    fn read_file_returns_error_for_missing_file() {
        let result = read_file(Path::new("/nonexistent/path.env"), "test read");
        let err = result.unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }

    #[test]
    fn remove_file_if_exists_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.sql");
        assert!(remove_file_if_exists(&path, "cleanup").is_ok());

        fs::write(&path, "x").unwrap();
        remove_file_if_exists(&path, "cleanup").unwrap();
        assert!(!path.exists());
    }
}
