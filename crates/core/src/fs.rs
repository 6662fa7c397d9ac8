//! Collaborator interfaces. The engine never touches the disk itself; callers plug in an
//! implementation (the CLI ships a local-filesystem one).

use anyhow::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
}

pub trait FilesystemInfo {
    fn exists(&self, path: &Path) -> bool;
    fn stat(&self, path: &Path) -> Result<EntryMeta>;
}

/// Bulk primitives. `copy` and `move_to` keep the source names and overwrite existing entries.
pub trait BulkTransfer {
    fn copy(&mut self, sources: &[PathBuf], destination_dir: &Path) -> Result<()>;
    fn move_to(&mut self, sources: &[PathBuf], destination_dir: &Path) -> Result<()>;
    fn copy_with_name(&mut self, source: &Path, destination_dir: &Path, new_name: &str)
        -> Result<()>;
    fn delete(&mut self, sources: &[PathBuf]) -> Result<()>;
}

pub trait RenameCommit {
    /// Renames `path` within its parent directory and returns the new path.
    fn rename(&mut self, path: &Path, new_name: &str) -> Result<PathBuf>;
}
