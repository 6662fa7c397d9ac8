use crate::error::{NameError, TransferError};
use crate::fs::{EntryMeta, FilesystemInfo};
use crate::pipeline::split_extension;
use crate::sanitize::validate_name;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    Copy,
    Move,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "new_name", rename_all = "snake_case")]
pub enum Resolution {
    Skip,
    Replace,
    Rename(String),
}

/// Answer to one conflict prompt. `apply_to_all` makes the choice sticky for the rest of the
/// current transfer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub resolution: Resolution,
    pub apply_to_all: bool,
}

impl Decision {
    pub fn once(resolution: Resolution) -> Self {
        Self {
            resolution,
            apply_to_all: false,
        }
    }

    pub fn for_all(resolution: Resolution) -> Self {
        Self {
            resolution,
            apply_to_all: true,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("競合の確認がキャンセルされました")]
pub struct PromptCancelled;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictDescriptor {
    pub source_path: PathBuf,
    pub existing_target_path: PathBuf,
    pub source_meta: Option<EntryMeta>,
    pub target_meta: Option<EntryMeta>,
    /// First free `stem (n).ext` name in the destination.
    pub suggested_name: String,
}

/// Asked once per unresolved conflict; may block on user input.
pub trait ConflictPrompt {
    fn request_resolution(
        &mut self,
        conflict: &ConflictDescriptor,
    ) -> Result<Decision, PromptCancelled>;
}

/// Sticky form of a [`Resolution`]. A sticky rename cannot reuse one literal name, so every
/// later conflict gets its own suggested name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkChoice {
    Skip,
    Replace,
    Rename,
}

impl From<&Resolution> for BulkChoice {
    fn from(value: &Resolution) -> Self {
        match value {
            Resolution::Skip => BulkChoice::Skip,
            Resolution::Replace => BulkChoice::Replace,
            Resolution::Rename(_) => BulkChoice::Rename,
        }
    }
}

/// Prompt that answers every conflict the same way without asking anyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPolicy(pub BulkChoice);

impl ConflictPrompt for FixedPolicy {
    fn request_resolution(
        &mut self,
        conflict: &ConflictDescriptor,
    ) -> Result<Decision, PromptCancelled> {
        let resolution = match self.0 {
            BulkChoice::Skip => Resolution::Skip,
            BulkChoice::Replace => Resolution::Replace,
            BulkChoice::Rename => Resolution::Rename(conflict.suggested_name.clone()),
        };
        Ok(Decision::for_all(resolution))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameCopy {
    pub source: PathBuf,
    pub new_name: String,
    /// Set for moves: the source is deleted only after the copy succeeded.
    pub delete_source: bool,
}

/// Sources partitioned by action. A source appears in exactly one list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPlan {
    pub kind: TransferKind,
    pub destination_dir: PathBuf,
    pub to_copy: Vec<PathBuf>,
    pub to_move: Vec<PathBuf>,
    pub to_rename_copy: Vec<RenameCopy>,
    pub skipped: Vec<PathBuf>,
}

impl TransferPlan {
    fn new(kind: TransferKind, destination_dir: &Path) -> Self {
        Self {
            kind,
            destination_dir: destination_dir.to_path_buf(),
            to_copy: Vec::new(),
            to_move: Vec::new(),
            to_rename_copy: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn actionable(&self) -> usize {
        self.to_copy.len() + self.to_move.len() + self.to_rename_copy.len()
    }

    fn push(&mut self, source: &Path, action: Action) {
        let source = source.to_path_buf();
        match action {
            Action::Keep => match self.kind {
                TransferKind::Copy => self.to_copy.push(source),
                TransferKind::Move => self.to_move.push(source),
            },
            Action::RenameCopy(new_name) => self.to_rename_copy.push(RenameCopy {
                source,
                new_name,
                delete_source: self.kind == TransferKind::Move,
            }),
            Action::Skip => self.skipped.push(source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Keep,
    RenameCopy(String),
    Skip,
}

/// Names already handed out in the destination during the current call.
#[derive(Debug, Default)]
struct Claims {
    names: HashSet<String>,
}

impl Claims {
    fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }

    fn claim(&mut self, name: &str) {
        self.names.insert(name.to_lowercase());
    }
}

/// Walks `sources` in order and decides what happens to each one. Duplicate source paths are
/// collapsed to their first occurrence. Cancelling any prompt discards the whole plan.
pub fn plan_transfer<F, P>(
    sources: &[PathBuf],
    destination_dir: &Path,
    kind: TransferKind,
    fs: &F,
    prompt: &mut P,
) -> Result<TransferPlan, TransferError>
where
    F: FilesystemInfo + ?Sized,
    P: ConflictPrompt + ?Sized,
{
    let mut seen = HashSet::<&Path>::new();
    let mut claims = Claims::default();

    let (plan, _sticky) = sources
        .iter()
        .filter(|source| seen.insert(source.as_path()))
        .try_fold(
            (TransferPlan::new(kind, destination_dir), None::<BulkChoice>),
            |(mut plan, sticky), source| {
                let (action, sticky) =
                    resolve_source(source, destination_dir, fs, prompt, sticky, &mut claims)?;
                debug!(source = %source.display(), ?action, "transfer source resolved");
                plan.push(source, action);
                Ok::<_, TransferError>((plan, sticky))
            },
        )?;

    Ok(plan)
}

fn resolve_source<F, P>(
    source: &Path,
    destination_dir: &Path,
    fs: &F,
    prompt: &mut P,
    sticky: Option<BulkChoice>,
    claims: &mut Claims,
) -> Result<(Action, Option<BulkChoice>), TransferError>
where
    F: FilesystemInfo + ?Sized,
    P: ConflictPrompt + ?Sized,
{
    let name = source
        .file_name()
        .and_then(|v| v.to_str())
        .map(str::to_string)
        .ok_or_else(|| TransferError::InvalidSource(source.to_path_buf()))?;
    let target = destination_dir.join(&name);

    if !is_taken(fs, destination_dir, claims, &name) {
        claims.claim(&name);
        return Ok((Action::Keep, sticky));
    }

    let suggested_name =
        suggest_unique_name(&name, |candidate| is_taken(fs, destination_dir, claims, candidate));

    let (resolution, sticky) = match sticky {
        Some(choice) => {
            let resolution = match choice {
                BulkChoice::Skip => Resolution::Skip,
                BulkChoice::Replace => Resolution::Replace,
                BulkChoice::Rename => Resolution::Rename(suggested_name),
            };
            (resolution, Some(choice))
        }
        None => {
            let source_meta = fs.stat(source).ok();
            let mut existing = target;
            loop {
                let conflict = ConflictDescriptor {
                    source_path: source.to_path_buf(),
                    target_meta: fs.stat(&existing).ok(),
                    existing_target_path: existing,
                    source_meta: source_meta.clone(),
                    suggested_name: suggested_name.clone(),
                };
                let decision = prompt.request_resolution(&conflict).map_err(|_| {
                    debug!(source = %source.display(), "conflict prompt cancelled");
                    TransferError::Cancelled
                })?;

                // A rename onto an occupied name is a conflict of its own.
                if let Resolution::Rename(new_name) = &decision.resolution {
                    check_rename_target(new_name)?;
                    if is_taken(fs, destination_dir, claims, new_name) {
                        debug!(source = %source.display(), %new_name, "rename target is taken, asking again");
                        existing = destination_dir.join(new_name);
                        continue;
                    }
                }

                let sticky = decision
                    .apply_to_all
                    .then(|| BulkChoice::from(&decision.resolution));
                break (decision.resolution, sticky);
            }
        }
    };

    let action = match resolution {
        Resolution::Skip => Action::Skip,
        Resolution::Replace => Action::Keep,
        Resolution::Rename(new_name) => {
            check_rename_target(&new_name)?;
            claims.claim(&new_name);
            Action::RenameCopy(new_name)
        }
    };
    Ok((action, sticky))
}

fn is_taken<F>(fs: &F, destination_dir: &Path, claims: &Claims, name: &str) -> bool
where
    F: FilesystemInfo + ?Sized,
{
    claims.contains(name) || fs.exists(&destination_dir.join(name))
}

fn check_rename_target(name: &str) -> Result<(), TransferError> {
    validate_name(name).map_err(|reason: NameError| TransferError::InvalidRenameTarget {
        name: name.to_string(),
        reason,
    })
}

/// Returns `stem (n).ext` for the smallest `n >= 2` that `taken` rejects.
pub fn suggest_unique_name(name: &str, taken: impl Fn(&str) -> bool) -> String {
    let (stem, ext) = split_extension(name);
    let mut n = 2usize;
    loop {
        let candidate = format!("{stem} ({n}){ext}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::testing::FakeFs;

    /// Replays scripted answers and counts how often it was asked.
    struct ScriptedPrompt {
        answers: Vec<Result<Decision, PromptCancelled>>,
        asked: Vec<ConflictDescriptor>,
    }

    impl ScriptedPrompt {
        fn new(answers: Vec<Result<Decision, PromptCancelled>>) -> Self {
            Self {
                answers: answers.into_iter().rev().collect(),
                asked: Vec::new(),
            }
        }
    }

    impl ConflictPrompt for ScriptedPrompt {
        fn request_resolution(
            &mut self,
            conflict: &ConflictDescriptor,
        ) -> Result<Decision, PromptCancelled> {
            self.asked.push(conflict.clone());
            self.answers.pop().unwrap_or(Err(PromptCancelled))
        }
    }

    fn paths(items: &[&str]) -> Vec<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn no_conflicts_keep_original_action() {
        let fs = FakeFs::with_paths(["/src/a.txt", "/src/b.txt"]);
        let mut prompt = ScriptedPrompt::new(Vec::new());

        let plan = plan_transfer(
            &paths(&["/src/a.txt", "/src/b.txt"]),
            Path::new("/dst"),
            TransferKind::Move,
            &fs,
            &mut prompt,
        )
        .expect("plan");
        assert_eq!(plan.to_move, paths(&["/src/a.txt", "/src/b.txt"]));
        assert!(plan.to_copy.is_empty());
        assert!(prompt.asked.is_empty());
    }

    #[test]
    fn rename_resolution_goes_to_rename_copy_only() {
        let fs = FakeFs::with_paths(["/src/f.txt", "/dst/f.txt"]);
        let mut prompt = ScriptedPrompt::new(vec![Ok(Decision::once(Resolution::Rename(
            "f_copy.txt".to_string(),
        )))]);

        let plan = plan_transfer(
            &paths(&["/src/f.txt"]),
            Path::new("/dst"),
            TransferKind::Copy,
            &fs,
            &mut prompt,
        )
        .expect("plan");
        assert_eq!(
            plan.to_rename_copy,
            vec![RenameCopy {
                source: PathBuf::from("/src/f.txt"),
                new_name: "f_copy.txt".to_string(),
                delete_source: false,
            }]
        );
        assert!(plan.to_copy.is_empty());
        assert!(plan.to_move.is_empty());
        assert!(plan.skipped.is_empty());

        let asked = &prompt.asked[0];
        assert_eq!(asked.existing_target_path, PathBuf::from("/dst/f.txt"));
        assert_eq!(asked.suggested_name, "f (2).txt");
        assert!(asked.source_meta.is_some());
        assert!(asked.target_meta.is_some());
    }

    #[test]
    fn rename_during_move_schedules_source_deletion() {
        let fs = FakeFs::with_paths(["/src/f.txt", "/dst/f.txt"]);
        let mut prompt = ScriptedPrompt::new(vec![Ok(Decision::once(Resolution::Rename(
            "g.txt".to_string(),
        )))]);

        let plan = plan_transfer(
            &paths(&["/src/f.txt"]),
            Path::new("/dst"),
            TransferKind::Move,
            &fs,
            &mut prompt,
        )
        .expect("plan");
        assert!(plan.to_rename_copy[0].delete_source);
        assert!(plan.to_move.is_empty());
    }

    #[test]
    fn sticky_replace_prompts_once() {
        let fs = FakeFs::with_paths(["/src/a.txt", "/src/b.txt", "/dst/a.txt", "/dst/b.txt"]);
        let mut prompt =
            ScriptedPrompt::new(vec![Ok(Decision::for_all(Resolution::Replace))]);

        let plan = plan_transfer(
            &paths(&["/src/a.txt", "/src/b.txt"]),
            Path::new("/dst"),
            TransferKind::Copy,
            &fs,
            &mut prompt,
        )
        .expect("plan");
        assert_eq!(prompt.asked.len(), 1);
        assert_eq!(plan.to_copy, paths(&["/src/a.txt", "/src/b.txt"]));
    }

    #[test]
    fn non_sticky_answer_prompts_again() {
        let fs = FakeFs::with_paths(["/dst/a.txt", "/dst/b.txt"]);
        let mut prompt = ScriptedPrompt::new(vec![
            Ok(Decision::once(Resolution::Skip)),
            Ok(Decision::once(Resolution::Replace)),
        ]);

        let plan = plan_transfer(
            &paths(&["/src/a.txt", "/src/b.txt"]),
            Path::new("/dst"),
            TransferKind::Copy,
            &fs,
            &mut prompt,
        )
        .expect("plan");
        assert_eq!(prompt.asked.len(), 2);
        assert_eq!(plan.skipped, paths(&["/src/a.txt"]));
        assert_eq!(plan.to_copy, paths(&["/src/b.txt"]));
    }

    #[test]
    fn sticky_rename_derives_distinct_names() {
        let fs = FakeFs::with_paths(["/dst/a.txt", "/dst/a (2).txt"]);
        let mut prompt = ScriptedPrompt::new(vec![Ok(Decision::for_all(Resolution::Rename(
            "a (3).txt".to_string(),
        )))]);

        let plan = plan_transfer(
            &paths(&["/one/a.txt", "/two/a.txt"]),
            Path::new("/dst"),
            TransferKind::Copy,
            &fs,
            &mut prompt,
        )
        .expect("plan");
        let names: Vec<&str> = plan
            .to_rename_copy
            .iter()
            .map(|r| r.new_name.as_str())
            .collect();
        assert_eq!(names, vec!["a (3).txt", "a (4).txt"]);
        assert_eq!(prompt.asked.len(), 1);
    }

    #[test]
    fn same_name_within_one_call_is_a_conflict() {
        let fs = FakeFs::default();
        let mut prompt = ScriptedPrompt::new(vec![Ok(Decision::once(Resolution::Skip))]);

        let plan = plan_transfer(
            &paths(&["/one/a.txt", "/two/a.txt"]),
            Path::new("/dst"),
            TransferKind::Copy,
            &fs,
            &mut prompt,
        )
        .expect("plan");
        assert_eq!(plan.to_copy, paths(&["/one/a.txt"]));
        assert_eq!(plan.skipped, paths(&["/two/a.txt"]));
    }

    #[test]
    fn duplicate_sources_land_in_one_partition() {
        let fs = FakeFs::default();
        let mut prompt = ScriptedPrompt::new(Vec::new());

        let plan = plan_transfer(
            &paths(&["/src/a.txt", "/src/a.txt"]),
            Path::new("/dst"),
            TransferKind::Copy,
            &fs,
            &mut prompt,
        )
        .expect("plan");
        assert_eq!(plan.to_copy, paths(&["/src/a.txt"]));
        assert!(plan.skipped.is_empty());
        assert!(prompt.asked.is_empty());
    }

    #[test]
    fn cancellation_discards_the_plan() {
        let fs = FakeFs::with_paths(["/dst/b.txt"]);
        let mut prompt = ScriptedPrompt::new(vec![Err(PromptCancelled)]);

        let err = plan_transfer(
            &paths(&["/src/a.txt", "/src/b.txt", "/src/c.txt"]),
            Path::new("/dst"),
            TransferKind::Move,
            &fs,
            &mut prompt,
        )
        .expect_err("cancel must abort");
        assert!(matches!(err, TransferError::Cancelled));
    }

    #[test]
    fn rename_onto_an_existing_name_asks_again() {
        let fs = FakeFs::with_paths(["/src/f.txt", "/dst/f.txt", "/dst/g.txt"]);
        let mut prompt = ScriptedPrompt::new(vec![
            Ok(Decision::once(Resolution::Rename("f.txt".to_string()))),
            Ok(Decision::once(Resolution::Rename("g.txt".to_string()))),
            Ok(Decision::once(Resolution::Rename("h.txt".to_string()))),
        ]);

        let plan = plan_transfer(
            &paths(&["/src/f.txt"]),
            Path::new("/dst"),
            TransferKind::Copy,
            &fs,
            &mut prompt,
        )
        .expect("plan");
        assert_eq!(prompt.asked.len(), 3);
        assert_eq!(prompt.asked[1].existing_target_path, PathBuf::from("/dst/f.txt"));
        assert_eq!(prompt.asked[2].existing_target_path, PathBuf::from("/dst/g.txt"));
        assert_eq!(
            plan.to_rename_copy,
            vec![RenameCopy {
                source: PathBuf::from("/src/f.txt"),
                new_name: "h.txt".to_string(),
                delete_source: false,
            }]
        );
    }

    #[test]
    fn rename_onto_a_name_claimed_earlier_asks_again() {
        let fs = FakeFs::with_paths(["/dst/b.txt"]);
        let mut prompt = ScriptedPrompt::new(vec![
            Ok(Decision::once(Resolution::Rename("a.txt".to_string()))),
            Err(PromptCancelled),
        ]);

        let err = plan_transfer(
            &paths(&["/src/a.txt", "/src/b.txt"]),
            Path::new("/dst"),
            TransferKind::Copy,
            &fs,
            &mut prompt,
        )
        .expect_err("cancelled on the second question");
        assert!(matches!(err, TransferError::Cancelled));
        assert_eq!(prompt.asked.len(), 2);
        assert_eq!(prompt.asked[1].existing_target_path, PathBuf::from("/dst/a.txt"));
    }

    #[test]
    fn invalid_rename_target_is_rejected() {
        let fs = FakeFs::with_paths(["/dst/a.txt"]);
        let mut prompt = ScriptedPrompt::new(vec![Ok(Decision::once(Resolution::Rename(
            "bad/name".to_string(),
        )))]);

        let err = plan_transfer(
            &paths(&["/src/a.txt"]),
            Path::new("/dst"),
            TransferKind::Copy,
            &fs,
            &mut prompt,
        )
        .expect_err("invalid name");
        assert!(matches!(err, TransferError::InvalidRenameTarget { .. }));
    }

    #[test]
    fn fixed_policy_never_needs_a_person() {
        let fs = FakeFs::with_paths(["/dst/a.txt", "/dst/b"]);
        let mut prompt = FixedPolicy(BulkChoice::Rename);

        let plan = plan_transfer(
            &paths(&["/src/a.txt", "/src/b"]),
            Path::new("/dst"),
            TransferKind::Copy,
            &fs,
            &mut prompt,
        )
        .expect("plan");
        let names: Vec<&str> = plan
            .to_rename_copy
            .iter()
            .map(|r| r.new_name.as_str())
            .collect();
        assert_eq!(names, vec!["a (2).txt", "b (2)"]);
    }

    #[test]
    fn suggest_unique_name_skips_taken_names() {
        let taken = ["x (2).tar.gz", "x.tar (2).gz"];
        assert_eq!(
            suggest_unique_name("x.tar.gz", |c| taken.contains(&c)),
            "x.tar (3).gz"
        );
        assert_eq!(suggest_unique_name(".env", |_| false), ".env (2)");
    }
}
