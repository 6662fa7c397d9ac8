use std::path::PathBuf;
use thiserror::Error;

/// Discriminant of a [`crate::Pattern`], used to name the failing rule in per-file errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Prefix,
    Suffix,
    Replace,
    Regex,
    Numbering,
    Case,
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PatternKind::Prefix => "prefix",
            PatternKind::Suffix => "suffix",
            PatternKind::Replace => "replace",
            PatternKind::Regex => "regex",
            PatternKind::Numbering => "numbering",
            PatternKind::Case => "case",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("{kind}パターンの正規表現が不正です '{pattern}': {reason}")]
    InvalidRegex {
        kind: PatternKind,
        pattern: String,
        reason: String,
    },
    #[error("regexパターンのフラグが不正です: {0}")]
    UnknownRegexFlag(char),
}

impl TransformError {
    pub fn kind(&self) -> PatternKind {
        match self {
            TransformError::InvalidRegex { kind, .. } => *kind,
            TransformError::UnknownRegexFlag(_) => PatternKind::Regex,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("ファイル名が空です")]
    Empty,
    #[error("使用できない文字が含まれています: {0:?}")]
    IllegalChar(char),
    #[error("予約済みのデバイス名は使用できません: {0}")]
    Reserved(String),
    #[error("ドットだけのファイル名は使用できません")]
    OnlyDots,
    #[error("ファイル名が長すぎます ({len}文字, 上限{max}文字)")]
    TooLong { len: usize, max: usize },
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("リネーム先が重複しています: {}", .names.join(", "))]
    DuplicateTargets { names: Vec<String> },
    #[error("リネームに失敗しました: {path}: {reason}")]
    Rename { path: PathBuf, reason: String },
    #[error("リネーム失敗後のロールバックにも失敗しました: {reason}")]
    Rollback { reason: String },
}

/// Which bulk primitive a [`TransferError::Primitive`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferOperation {
    Copy,
    Move,
}

impl std::fmt::Display for TransferOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferOperation::Copy => f.write_str("copy"),
            TransferOperation::Move => f.write_str("move"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("ユーザーにより転送がキャンセルされました")]
    Cancelled,
    #[error("転送元のファイル名を取得できません: {0}")]
    InvalidSource(PathBuf),
    #[error("リネーム後の名前が不正です '{name}': {reason}")]
    InvalidRenameTarget { name: String, reason: NameError },
    #[error(
        "一括{operation}に失敗しました (処理済み {processed}件, 未処理 {unprocessed}件): {reason}"
    )]
    Primitive {
        operation: TransferOperation,
        processed: usize,
        unprocessed: usize,
        reason: String,
    },
}
