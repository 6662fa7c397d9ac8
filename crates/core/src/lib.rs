mod apply;
mod config;
mod conflict;
mod entry;
mod error;
pub mod fs;
mod pattern;
mod pipeline;
mod planner;
mod sanitize;
mod transfer;

pub use apply::{commit_renames, CommitResult};
pub use config::{app_paths, load_config, parse_config, AppConfig, AppPaths, OnConflict};
pub use conflict::{
    plan_transfer, suggest_unique_name, BulkChoice, ConflictDescriptor, ConflictPrompt, Decision,
    FixedPolicy, PromptCancelled, RenameCopy, Resolution, TransferKind, TransferPlan,
};
pub use entry::{EntryKind, FileEntry};
pub use error::{
    CommitError, NameError, PatternKind, TransferError, TransferOperation, TransformError,
};
pub use fs::{BulkTransfer, EntryMeta, FilesystemInfo, RenameCommit};
pub use pattern::{apply_pattern, CaseStyle, NumberPosition, Pattern, PreparedPattern};
pub use pipeline::{rename_entry, split_extension, PreparedPipeline, PreviewItem, RenameConfig};
pub use planner::{
    generate_preview, summarize_preview, validate, IssueKind, PreviewStats, ValidationIssue,
    ValidationResult,
};
pub use sanitize::{is_valid_name, validate_name, MAX_NAME_LEN};
pub use transfer::{execute_plan, transfer, ItemFailure, TransferSummary};
