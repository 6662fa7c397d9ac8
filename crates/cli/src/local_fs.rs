//! Local-disk implementation of the engine's collaborator traits.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use fbatch_core::{BulkTransfer, EntryKind, EntryMeta, FileEntry, FilesystemInfo, RenameCommit};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FilesystemInfo for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn stat(&self, path: &Path) -> Result<EntryMeta> {
        let meta = fs::metadata(path)
            .with_context(|| format!("メタデータを取得できませんでした: {}", path.display()))?;
        Ok(EntryMeta {
            is_dir: meta.is_dir(),
            size: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Local>::from),
        })
    }
}

impl BulkTransfer for LocalFs {
    /// Sources sharing a file name are copied one after another in input order, so the last
    /// one wins; distinct names are copied in parallel.
    fn copy(&mut self, sources: &[PathBuf], destination_dir: &Path) -> Result<()> {
        let mut groups = BTreeMap::<&OsStr, Vec<&Path>>::new();
        for source in sources {
            groups.entry(file_name(source)?).or_default().push(source);
        }

        groups
            .into_par_iter()
            .try_for_each(|(name, group)| -> Result<()> {
                let target = destination_dir.join(name);
                for source in group {
                    copy_entry(source, &target)?;
                }
                Ok(())
            })
    }

    fn move_to(&mut self, sources: &[PathBuf], destination_dir: &Path) -> Result<()> {
        for source in sources {
            let target = destination_dir.join(file_name(source)?);
            move_entry(source, &target)?;
        }
        Ok(())
    }

    fn copy_with_name(
        &mut self,
        source: &Path,
        destination_dir: &Path,
        new_name: &str,
    ) -> Result<()> {
        copy_entry(source, &destination_dir.join(new_name))
    }

    fn delete(&mut self, sources: &[PathBuf]) -> Result<()> {
        for source in sources {
            remove_entry(source)?;
        }
        Ok(())
    }
}

impl RenameCommit for LocalFs {
    fn rename(&mut self, path: &Path, new_name: &str) -> Result<PathBuf> {
        let parent = path
            .parent()
            .context("親ディレクトリを取得できませんでした")?;
        let target = parent.join(new_name);
        // fs::rename replaces silently; an entry outside the batch must never be overwritten.
        if fs::symlink_metadata(&target).is_ok() && !same_entry(path, &target) {
            bail!("リネーム先が既に存在します: {}", target.display());
        }
        fs::rename(path, &target).with_context(|| {
            format!(
                "リネームに失敗しました: {} -> {}",
                path.display(),
                target.display()
            )
        })?;
        Ok(target)
    }
}

/// Lists the entries below `root` in file-name order. Hidden entries (and everything below a
/// hidden folder) are left out unless `include_hidden` is set. Entries whose names are not
/// valid UTF-8 are skipped with a warning, since they cannot be renamed without changing bytes.
pub fn collect_entries(root: &Path, recursive: bool, include_hidden: bool) -> Result<Vec<FileEntry>> {
    if !root.is_dir() {
        bail!("フォルダが存在しません: {}", root.display());
    }

    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut out = Vec::new();
    for entry in walker
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || include_hidden || !is_hidden(e.path()))
    {
        let entry =
            entry.with_context(|| format!("フォルダ走査に失敗しました: {}", root.display()))?;
        if entry.file_name().to_str().is_none() {
            warn!(path = %entry.path().display(), "skipping entry with a non UTF-8 name");
            continue;
        }
        let kind = if entry.file_type().is_dir() {
            EntryKind::Folder
        } else {
            EntryKind::File
        };
        out.push(FileEntry::new(entry.path(), kind));
    }
    Ok(out)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> Result<&OsStr> {
    path.file_name()
        .with_context(|| format!("ファイル名を取得できませんでした: {}", path.display()))
}

fn same_entry(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn copy_entry(source: &Path, target: &Path) -> Result<()> {
    if same_entry(source, target) {
        bail!("同じ場所へはコピーできません: {}", source.display());
    }
    if fs::symlink_metadata(target).is_ok() {
        remove_entry(target)?;
    }

    if source.is_dir() {
        copy_dir(source, target)
    } else {
        fs::copy(source, target).with_context(|| {
            format!(
                "コピーに失敗しました: {} -> {}",
                source.display(),
                target.display()
            )
        })?;
        Ok(())
    }
}

fn copy_dir(source: &Path, target: &Path) -> Result<()> {
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("フォルダ走査に失敗しました: {}", source.display()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .context("相対パスを解決できませんでした")?;
        let dest = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).with_context(|| {
                format!("フォルダを作成できませんでした: {}", dest.display())
            })?;
        } else {
            fs::copy(entry.path(), &dest).with_context(|| {
                format!(
                    "コピーに失敗しました: {} -> {}",
                    entry.path().display(),
                    dest.display()
                )
            })?;
        }
    }
    Ok(())
}

fn move_entry(source: &Path, target: &Path) -> Result<()> {
    if same_entry(source, target) {
        return Ok(());
    }
    if fs::symlink_metadata(target).is_ok() {
        remove_entry(target)?;
    }

    if let Err(err) = fs::rename(source, target) {
        debug!(source = %source.display(), error = %err, "rename failed, falling back to copy");
        copy_entry(source, target)?;
        remove_entry(source)?;
    }
    Ok(())
}

fn remove_entry(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path)
        .with_context(|| format!("削除対象が見つかりません: {}", path.display()))?;
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.with_context(|| format!("削除に失敗しました: {}", path.display()))
}
