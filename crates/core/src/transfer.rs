use crate::conflict::{plan_transfer, ConflictPrompt, TransferKind, TransferPlan};
use crate::error::{TransferError, TransferOperation};
use crate::fs::{BulkTransfer, FilesystemInfo};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub source: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TransferSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: Vec<ItemFailure>,
}

/// Resolves conflicts for `sources` and executes the resulting plan. A cancelled prompt
/// returns before any transfer primitive is called.
pub fn transfer<E, P>(
    sources: &[PathBuf],
    destination_dir: &Path,
    kind: TransferKind,
    engine: &mut E,
    prompt: &mut P,
) -> Result<TransferSummary, TransferError>
where
    E: FilesystemInfo + BulkTransfer + ?Sized,
    P: ConflictPrompt + ?Sized,
{
    let plan = plan_transfer(sources, destination_dir, kind, &*engine, prompt)?;
    execute_plan(&plan, engine)
}

/// Dispatches one bulk copy, one bulk move, then every rename-copy on its own.
///
/// A failing bulk call aborts the rest of the plan; groups already transferred stay where they
/// are. Rename-copies fail one by one and are reported in [`TransferSummary::failed`].
pub fn execute_plan<B>(
    plan: &TransferPlan,
    bulk: &mut B,
) -> Result<TransferSummary, TransferError>
where
    B: BulkTransfer + ?Sized,
{
    let destination = plan.destination_dir.as_path();
    let mut remaining = plan.actionable();
    let mut processed = 0usize;

    if !plan.to_copy.is_empty() {
        bulk.copy(&plan.to_copy, destination)
            .map_err(|err| primitive_error(TransferOperation::Copy, processed, remaining, &err))?;
        processed += plan.to_copy.len();
        remaining -= plan.to_copy.len();
    }

    if !plan.to_move.is_empty() {
        bulk.move_to(&plan.to_move, destination)
            .map_err(|err| primitive_error(TransferOperation::Move, processed, remaining, &err))?;
        processed += plan.to_move.len();
    }

    let mut failed = Vec::new();
    for item in &plan.to_rename_copy {
        if let Err(err) = bulk.copy_with_name(&item.source, destination, &item.new_name) {
            let message = format!("{err:#}");
            warn!(source = %item.source.display(), new_name = %item.new_name, %message, "rename-copy failed");
            failed.push(ItemFailure {
                source: item.source.clone(),
                message,
            });
            continue;
        }

        // The source goes away only once its copy exists.
        if item.delete_source {
            if let Err(err) = bulk.delete(std::slice::from_ref(&item.source)) {
                let message = format!("コピー後の元ファイル削除に失敗しました: {err:#}");
                warn!(source = %item.source.display(), %message, "source cleanup after rename-copy failed");
                failed.push(ItemFailure {
                    source: item.source.clone(),
                    message,
                });
                continue;
            }
        }
        processed += 1;
    }

    info!(
        kind = ?plan.kind,
        processed,
        skipped = plan.skipped.len(),
        failed = failed.len(),
        "transfer finished"
    );
    Ok(TransferSummary {
        processed,
        skipped: plan.skipped.len(),
        failed,
    })
}

fn primitive_error(
    operation: TransferOperation,
    processed: usize,
    unprocessed: usize,
    err: &anyhow::Error,
) -> TransferError {
    let reason = format!("{err:#}");
    warn!(%operation, processed, unprocessed, %reason, "bulk transfer failed");
    TransferError::Primitive {
        operation,
        processed,
        unprocessed,
        reason,
    }
}
