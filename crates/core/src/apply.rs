use crate::error::CommitError;
use crate::fs::RenameCommit;
use crate::pipeline::PreviewItem;
use crate::planner::{validate, IssueKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CommitResult {
    pub applied: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
struct StagedRename {
    original_path: PathBuf,
    original_name: String,
    new_name: String,
    temp_name: String,
    temp_path: PathBuf,
}

/// Commits an accepted preview through `committer`.
///
/// Duplicate targets block the whole batch. Items carrying an error are skipped. Every changed
/// item is first moved to a temporary name and only then to its final name, so swaps within
/// one batch work; a failure rolls every already-moved item back.
pub fn commit_renames<R>(
    items: &[PreviewItem],
    committer: &mut R,
) -> Result<CommitResult, CommitError>
where
    R: RenameCommit + ?Sized,
{
    let validation = validate(items);
    if validation.has_duplicates() {
        let names = validation
            .errors
            .iter()
            .filter(|issue| issue.kind == IssueKind::DuplicateTarget)
            .map(|issue| issue.name.clone())
            .collect();
        return Err(CommitError::DuplicateTargets { names });
    }

    let skipped = items.iter().filter(|i| i.has_error).count();
    let unchanged = items.iter().filter(|i| i.is_noop()).count();
    let candidates: Vec<&PreviewItem> = items
        .iter()
        .filter(|i| !i.has_error && !i.is_noop())
        .collect();
    if candidates.is_empty() {
        return Ok(CommitResult {
            applied: 0,
            unchanged,
            skipped,
        });
    }

    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);

    let mut staged = Vec::<StagedRename>::with_capacity(candidates.len());
    for (index, candidate) in candidates.iter().enumerate() {
        let temp_name = format!(".fbatch_tmp_{stamp}_{index}");
        match committer.rename(&candidate.original_path, &temp_name) {
            Ok(temp_path) => staged.push(StagedRename {
                original_path: candidate.original_path.clone(),
                original_name: candidate.original_name.clone(),
                new_name: candidate.new_name.clone(),
                temp_name,
                temp_path,
            }),
            Err(err) => {
                let stage_err = CommitError::Rename {
                    path: candidate.original_path.clone(),
                    reason: format!("{err:#}"),
                };
                return Err(with_rollback(stage_err, rollback_staged(committer, &staged)));
            }
        }
    }

    let mut finalized = Vec::<PathBuf>::with_capacity(staged.len());
    for entry in &staged {
        match committer.rename(&entry.temp_path, &entry.new_name) {
            Ok(final_path) => finalized.push(final_path),
            Err(err) => {
                let apply_err = CommitError::Rename {
                    path: entry.original_path.clone(),
                    reason: format!("{err:#}"),
                };
                let rollback = rollback_finalized(committer, &staged, &finalized)
                    .and_then(|_| rollback_staged(committer, &staged));
                return Err(with_rollback(apply_err, rollback));
            }
        }
    }

    info!(applied = finalized.len(), unchanged, skipped, "renames committed");
    Ok(CommitResult {
        applied: finalized.len(),
        unchanged,
        skipped,
    })
}

fn with_rollback(err: CommitError, rollback: Result<(), String>) -> CommitError {
    match rollback {
        Ok(()) => err,
        Err(rollback_err) => {
            warn!(%err, %rollback_err, "rollback failed");
            CommitError::Rollback {
                reason: format!("{err}; {rollback_err}"),
            }
        }
    }
}

fn rollback_staged<R>(committer: &mut R, staged: &[StagedRename]) -> Result<(), String>
where
    R: RenameCommit + ?Sized,
{
    for entry in staged.iter().rev() {
        committer
            .rename(&entry.temp_path, &entry.original_name)
            .map_err(|e| {
                format!(
                    "ロールバックに失敗しました: {} -> {}: {e:#}",
                    entry.temp_path.display(),
                    entry.original_name
                )
            })?;
    }
    Ok(())
}

fn rollback_finalized<R>(
    committer: &mut R,
    staged: &[StagedRename],
    finalized: &[PathBuf],
) -> Result<(), String>
where
    R: RenameCommit + ?Sized,
{
    for (entry, final_path) in staged.iter().zip(finalized).rev() {
        committer.rename(final_path, &entry.temp_name).map_err(|e| {
            format!(
                "ロールバック(退避)に失敗しました: {} -> {}: {e:#}",
                final_path.display(),
                entry.temp_name
            )
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::FileEntry;
    use crate::fs::testing::{Call, FakeFs};
    use crate::pattern::Pattern;
    use crate::pipeline::RenameConfig;
    use crate::planner::generate_preview;
    use crate::sanitize::MAX_NAME_LEN;
    use std::path::Path;

    fn preview(names: &[&str], patterns: Vec<Pattern>) -> Vec<PreviewItem> {
        let entries: Vec<FileEntry> = names
            .iter()
            .map(|n| FileEntry::file(format!("/d/{n}")))
            .collect();
        generate_preview(&entries, &RenameConfig::with_patterns(patterns))
    }

    fn manual(original: &str, new_name: &str) -> PreviewItem {
        let entry = FileEntry::file(format!("/d/{original}"));
        PreviewItem {
            original_path: entry.path.clone(),
            original_name: entry.name.clone(),
            new_name: new_name.to_string(),
            has_error: false,
            error_message: None,
            source_entry: entry,
        }
    }

    #[test]
    fn commits_changed_items_and_counts_the_rest() {
        let items = preview(&["a.txt", "keep.txt"], vec![Pattern::replace("a", "z")]);
        let mut fs = FakeFs::with_paths(["/d/a.txt", "/d/keep.txt"]);

        let result = commit_renames(&items, &mut fs).expect("commit should succeed");
        assert_eq!(
            result,
            CommitResult {
                applied: 1,
                unchanged: 1,
                skipped: 0
            }
        );
        assert!(fs.exists_path("/d/z.txt"));
        assert!(!fs.exists_path("/d/a.txt"));
        assert!(fs.exists_path("/d/keep.txt"));
    }

    #[test]
    fn duplicate_targets_block_without_any_call() {
        let items = preview(&["a.txt", "b.txt"], vec![Pattern::regex(".+", "x", "")]);
        let mut fs = FakeFs::with_paths(["/d/a.txt", "/d/b.txt"]);

        let err = commit_renames(&items, &mut fs).expect_err("duplicates must block");
        assert!(matches!(err, CommitError::DuplicateTargets { ref names } if names == &["x.txt"]));
        assert!(fs.calls.is_empty());
    }

    #[test]
    fn swapping_names_goes_through_temporary_names() {
        let items = vec![manual("a.txt", "b.txt"), manual("b.txt", "a.txt")];
        let mut fs = FakeFs::with_paths(["/d/a.txt", "/d/b.txt"]);

        let result = commit_renames(&items, &mut fs).expect("swap should succeed");
        assert_eq!(result.applied, 2);
        assert_eq!(fs.paths.len(), 2);
        assert_eq!(fs.calls.len(), 4);
    }

    #[test]
    fn long_names_stay_within_the_name_limit_while_staged() {
        let original = format!("{}.txt", "a".repeat(240));
        let items = preview(&[original.as_str()], vec![Pattern::prefix("Q")]);
        assert!(!items[0].has_error);
        let mut fs = FakeFs::with_paths([format!("/d/{original}")]);

        let result = commit_renames(&items, &mut fs).expect("commit");
        assert_eq!(result.applied, 1);
        assert!(fs.exists_path(&format!("/d/Q{original}")));
        for call in &fs.calls {
            if let Call::Rename(_, name) = call {
                assert!(name.chars().count() <= MAX_NAME_LEN, "{name}");
            }
        }
    }

    #[test]
    fn error_items_are_skipped() {
        let items = preview(&["a.txt"], vec![Pattern::regex("(", "", "g")]);
        let mut fs = FakeFs::with_paths(["/d/a.txt"]);

        let result = commit_renames(&items, &mut fs).expect("nothing to do");
        assert_eq!(result.skipped, 1);
        assert!(fs.calls.is_empty());
    }

    #[test]
    fn failure_in_final_phase_rolls_everything_back() {
        let items = vec![manual("a.txt", "x.txt"), manual("b.txt", "y.txt")];
        let mut fs = FakeFs::with_paths(["/d/a.txt", "/d/b.txt"]);
        fs.fail_rename.insert("y.txt".to_string());

        let err = commit_renames(&items, &mut fs).expect_err("second rename fails");
        assert!(matches!(err, CommitError::Rename { ref path, .. } if path == Path::new("/d/b.txt")));
        assert!(fs.exists_path("/d/a.txt"));
        assert!(fs.exists_path("/d/b.txt"));
        assert_eq!(fs.paths.len(), 2);
        assert!(fs.calls.iter().any(|c| matches!(
            c,
            Call::Rename(p, n) if p == Path::new("/d/x.txt") && n.starts_with(".fbatch_tmp_")
        )));
    }
}
