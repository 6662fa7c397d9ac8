use crate::entry::FileEntry;
use crate::pipeline::{PreparedPipeline, PreviewItem, RenameConfig};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    DuplicateTarget,
    InvalidItem,
    NoOp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub path: Option<PathBuf>,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn has_duplicates(&self) -> bool {
        self.errors
            .iter()
            .any(|issue| issue.kind == IssueKind::DuplicateTarget)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PreviewStats {
    pub scanned: usize,
    pub filtered_out: usize,
    pub planned: usize,
    pub unchanged: usize,
    pub errors: usize,
}

/// Runs the rename pipeline over every entry that passes the folder/file filter. The index
/// handed to each pattern is the position in the filtered list.
pub fn generate_preview(files: &[FileEntry], config: &RenameConfig) -> Vec<PreviewItem> {
    let pipeline = PreparedPipeline::new(config);
    let filtered: Vec<&FileEntry> = files.iter().filter(|f| config.includes(f)).collect();

    let items: Vec<PreviewItem> = filtered
        .par_iter()
        .enumerate()
        .map(|(index, entry)| pipeline.rename(entry, index))
        .collect();

    info!(
        scanned = files.len(),
        planned = items.len(),
        "rename preview generated"
    );
    items
}

pub fn summarize_preview(files: &[FileEntry], items: &[PreviewItem]) -> PreviewStats {
    PreviewStats {
        scanned: files.len(),
        filtered_out: files.len().saturating_sub(items.len()),
        planned: items.len(),
        unchanged: items.iter().filter(|i| i.is_noop()).count(),
        errors: items.iter().filter(|i| i.has_error).count(),
    }
}

/// Audits a preview without touching it: duplicate targets (case-insensitive, per directory)
/// and per-item failures are errors, no-op renames collapse into one warning.
pub fn validate(items: &[PreviewItem]) -> ValidationResult {
    let mut buckets = BTreeMap::<(&Path, String), Vec<&PreviewItem>>::new();
    for item in items {
        buckets
            .entry((item.source_entry.parent(), item.new_name.to_lowercase()))
            .or_default()
            .push(item);
    }

    let mut errors = Vec::new();
    for ((parent, _), colliding) in &buckets {
        if colliding.len() < 2 {
            continue;
        }
        let originals: Vec<&str> = colliding.iter().map(|i| i.original_name.as_str()).collect();
        errors.push(ValidationIssue {
            kind: IssueKind::DuplicateTarget,
            path: Some(parent.to_path_buf()),
            name: colliding[0].new_name.clone(),
            message: format!(
                "リネーム後の名前 '{}' が重複しています: {}",
                colliding[0].new_name,
                originals.join(", ")
            ),
        });
    }

    for item in items.iter().filter(|i| i.has_error) {
        errors.push(ValidationIssue {
            kind: IssueKind::InvalidItem,
            path: Some(item.original_path.clone()),
            name: item.original_name.clone(),
            message: item.error_message.clone().unwrap_or_default(),
        });
    }

    let mut warnings = Vec::new();
    let noops: Vec<&PreviewItem> = items.iter().filter(|i| i.is_noop()).collect();
    if let Some(first) = noops.first() {
        warnings.push(ValidationIssue {
            kind: IssueKind::NoOp,
            path: None,
            name: first.original_name.clone(),
            message: format!("{}件のファイル名は変更されません", noops.len()),
        });
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}
