//! Saving composites to disk

use crate::{Error, Result};
use chrono::Local;
use log::info;
use std::path::{Path, PathBuf};

/// Write an encoded PNG under `dir` as `fullpage-<timestamp>.png`.
///
/// Creates the directory if it does not exist and returns the written path.
pub fn save_png(png: &[u8], dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::Other(format!("Failed to create {}: {}", dir.display(), e)))?;

    let filename = format!("fullpage-{}.png", Local::now().format("%Y%m%d%H%M%S"));
    let path = dir.join(filename);

    std::fs::write(&path, png)
        .map_err(|e| Error::Other(format!("Failed to write {}: {}", path.display(), e)))?;

    info!("screenshot saved: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_with_timestamped_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_png(b"\x89PNG\r\n\x1a\n", dir.path()).unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("fullpage-"));
        assert!(name.ends_with(".png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("captures/today");
        let path = save_png(b"png", &nested).unwrap();
        assert!(path.starts_with(&nested));
    }
}
