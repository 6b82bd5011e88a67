//! Entry storage.
//!
//! The TIL collection lives in one JSON document inside the blog's work
//! tree. [`EntryStore`] is the persistence boundary; [`JsonFileStore`] is
//! the only backend.

mod json_file;
mod traits;

pub use json_file::{JsonFileStore, MAX_STORE_SIZE, to_json};
pub use traits::EntryStore;

use std::fs;
use std::io;
use std::path::Path;

/// Writes `content` to a sibling temp file, then renames it over `path`.
///
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(".tmp");
    let temp = path.with_file_name(temp_name);

    fs::write(&temp, content)?;
    fs::rename(&temp, path).inspect_err(|_| {
        let _ = fs::remove_file(&temp);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_parents_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b.json");
        write_atomic(&path, "one").unwrap();
        write_atomic(&path, "two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
        assert!(!dir.path().join("a").join(".b.json.tmp").exists());
    }
}
