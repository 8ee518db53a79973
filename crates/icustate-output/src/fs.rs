use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::{OutputError, Result};

/// Creates the parent directory of `path` when missing.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| OutputError::io("create directory", parent, e))?;
    }
    Ok(())
}

/// Sibling path a writer fills before renaming it into place.
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

pub(crate) fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| OutputError::io("create", path, e))
}

pub(crate) fn commit(partial: &Path, path: &Path) -> Result<()> {
    fs::rename(partial, path).map_err(|e| OutputError::io("rename", partial, e))
}

pub(crate) fn discard(partial: &Path) {
    // Nothing to clean up when the file was never created.
    let _ = fs::remove_file(partial);
}
