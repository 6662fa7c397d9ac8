use crate::entry::FileEntry;
use crate::error::TransformError;
use crate::pattern::{Pattern, PreparedPattern};
use crate::sanitize::validate_name;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameConfig {
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub apply_to_folders: bool,
    #[serde(default = "default_true")]
    pub apply_to_files: bool,
    #[serde(default = "default_true")]
    pub preserve_extension: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            apply_to_folders: false,
            apply_to_files: true,
            preserve_extension: true,
        }
    }
}

impl RenameConfig {
    pub fn with_patterns(patterns: Vec<Pattern>) -> Self {
        Self {
            patterns,
            ..Self::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("リネーム設定(TOML)のパースに失敗しました")
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("リネーム設定(JSON)のパースに失敗しました")
    }

    pub fn includes(&self, entry: &FileEntry) -> bool {
        if entry.is_folder_like() {
            self.apply_to_folders
        } else {
            self.apply_to_files
        }
    }
}

/// Proposed rename for one entry. `new_name` equals `original_name` whenever `has_error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewItem {
    pub original_path: PathBuf,
    pub original_name: String,
    pub new_name: String,
    pub has_error: bool,
    pub error_message: Option<String>,
    pub source_entry: FileEntry,
}

impl PreviewItem {
    pub fn is_noop(&self) -> bool {
        !self.has_error && self.new_name == self.original_name
    }

    pub fn target_path(&self) -> PathBuf {
        self.source_entry.parent().join(&self.new_name)
    }
}

/// Enabled patterns of a config, compiled once for the whole batch.
#[derive(Debug)]
pub struct PreparedPipeline<'a> {
    patterns: Vec<PreparedPattern<'a>>,
    deferred_suffix: Option<&'a str>,
    preserve_extension: bool,
}

impl<'a> PreparedPipeline<'a> {
    pub fn new(config: &'a RenameConfig) -> Self {
        let enabled = config.patterns.iter().filter(|p| p.is_enabled());
        let deferred_suffix = enabled.clone().find_map(|p| match p {
            Pattern::Suffix {
                text,
                before_extension: false,
                ..
            } => Some(text.as_str()),
            _ => None,
        });
        Self {
            patterns: enabled.map(PreparedPattern::new).collect(),
            deferred_suffix,
            preserve_extension: config.preserve_extension,
        }
    }

    pub fn rename(&self, entry: &FileEntry, index: usize) -> PreviewItem {
        let result = self
            .transform(&entry.name, index)
            .map_err(|err| format!("{}パターンの適用に失敗しました: {err}", err.kind()))
            .and_then(|candidate| {
                validate_name(&candidate)
                    .map(|_| candidate)
                    .map_err(|err| err.to_string())
            });

        match result {
            Ok(new_name) => PreviewItem {
                original_path: entry.path.clone(),
                original_name: entry.name.clone(),
                new_name,
                has_error: false,
                error_message: None,
                source_entry: entry.clone(),
            },
            Err(message) => {
                debug!(path = %entry.path.display(), %message, "rename candidate rejected");
                PreviewItem {
                    original_path: entry.path.clone(),
                    original_name: entry.name.clone(),
                    new_name: entry.name.clone(),
                    has_error: true,
                    error_message: Some(message),
                    source_entry: entry.clone(),
                }
            }
        }
    }

    fn transform(&self, name: &str, index: usize) -> Result<String, TransformError> {
        let (base, ext) = if self.preserve_extension {
            split_extension(name)
        } else {
            (name, "")
        };
        let mut base = base.to_string();

        for pattern in &self.patterns {
            if pattern.pattern().is_deferred_suffix() {
                continue;
            }
            base = pattern.apply(&base, index)?;
        }

        let mut out = format!("{base}{ext}");
        if let Some(text) = self.deferred_suffix {
            out.push_str(text);
        }
        Ok(out)
    }
}

/// Runs the whole pipeline for a single entry.
pub fn rename_entry(entry: &FileEntry, config: &RenameConfig, index: usize) -> PreviewItem {
    PreparedPipeline::new(config).rename(entry, index)
}

/// Splits `name` at its last dot when that dot is neither the first nor the last character.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < name.len() => name.split_at(pos),
        _ => (name, ""),
    }
}
