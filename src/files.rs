//! Filesystem helpers shared by the stages.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Copy a directory tree. `dst` is created if needed.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Remove a file or directory tree. Returns whether anything was removed;
/// an absent path is not an error.
pub fn remove_path(path: &Path) -> io::Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}

/// Transient artifacts that must not outlive a stage.
///
/// Tracked paths are removed by [`Scratch::clear`] on the success path, or on
/// drop when a stage returns early with an error.
#[derive(Debug, Default)]
pub struct Scratch {
    paths: Vec<PathBuf>,
}

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Remove every tracked path, returning the ones that existed.
    pub fn clear(mut self) -> io::Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for path in std::mem::take(&mut self.paths) {
            if remove_path(&path)? {
                removed.push(path);
            }
        }
        Ok(removed)
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        for path in &self.paths {
            let _ = remove_path(path);
        }
    }
}
