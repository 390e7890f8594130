//! Notebook file I/O: reading, and the backup-then-rewrite dance.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, instrument};

/// Read a notebook's raw text.
pub fn read_document(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read notebook {}", path.display()))
}

/// Where the previous contents go before a rewrite: the full file name with
/// `.orig` appended, so `notes.md` is preserved as `notes.md.orig`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".orig");
    PathBuf::from(name)
}

/// Copy the current file to its backup path, then overwrite it with
/// `contents`. An existing backup is replaced.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn write_with_backup(path: &Path, contents: &str) -> Result<()> {
    let backup = backup_path(path);
    fs::copy(path, &backup)
        .with_context(|| format!("back up {} to {}", path.display(), backup.display()))?;
    fs::write(path, contents).with_context(|| format!("write notebook {}", path.display()))?;
    debug!(backup = %backup.display(), "rewrote notebook");
    Ok(())
}
