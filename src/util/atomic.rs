//! Atomic file writes.
//!
//! Content is written to a sibling `.tmp` file, synced, and renamed over the
//! destination, so readers see either the previous file or the complete new
//! one.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// Atomically replace `path` with `content`, creating parent directories.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    let path = path.as_ref();
    let mut temp_name = path.as_os_str().to_os_string();
    temp_name.push(".tmp");
    let temp_path = Path::new(&temp_name);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(temp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    fs::rename(temp_path, path)?;

    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json_pretty<P: AsRef<Path>, T: Serialize + ?Sized>(path: P, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("out.json");

        atomic_write(&path, "first").unwrap();
        atomic_write(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!temp_dir.path().join("nested").join("out.json.tmp").exists());
    }

    #[test]
    fn test_write_json_pretty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("map.json");

        write_json_pretty(&path, &vec!["a", "b"]).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains('\n'));
        let parsed: Vec<String> = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, vec!["a", "b"]);
    }
}
