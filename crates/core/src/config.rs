use crate::conflict::BulkChoice;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnConflict {
    #[default]
    Ask,
    Skip,
    Replace,
    Rename,
}

impl OnConflict {
    /// `None` means a person has to be asked.
    pub fn fixed_choice(self) -> Option<BulkChoice> {
        match self {
            OnConflict::Ask => None,
            OnConflict::Skip => Some(BulkChoice::Skip),
            OnConflict::Replace => Some(BulkChoice::Replace),
            OnConflict::Rename => Some(BulkChoice::Rename),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub preserve_extension: bool,
    pub apply_to_files: bool,
    pub apply_to_folders: bool,
    pub recursive_default: bool,
    pub include_hidden_default: bool,
    pub on_conflict: OnConflict,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preserve_extension: true,
            apply_to_files: true,
            apply_to_folders: false,
            recursive_default: false,
            include_hidden_default: false,
            on_conflict: OnConflict::Ask,
            log_level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "kelly", "fbatch")
        .context("OS標準設定ディレクトリを取得できませんでした")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

/// Reads the user's defaults. A missing file yields [`AppConfig::default`]; nothing is ever
/// written back.
pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    if !paths.config_path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(&paths.config_path).with_context(|| {
        format!(
            "設定ファイルを読めませんでした: {}",
            paths.config_path.display()
        )
    })?;

    parse_config(&raw)
}

pub fn parse_config(raw: &str) -> Result<AppConfig> {
    toml::from_str::<AppConfig>(raw).context("設定ファイルのパースに失敗しました")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config = parse_config("on_conflict = \"rename\"\napply_to_folders = true\n")
            .expect("must parse");
        assert_eq!(config.on_conflict, OnConflict::Rename);
        assert!(config.apply_to_folders);
        assert!(config.preserve_extension);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn broken_config_is_an_error() {
        let err = parse_config("on_conflict = \"sometimes\"").expect_err("must fail");
        assert!(err.to_string().contains("設定ファイルのパースに失敗しました"));
    }

    #[test]
    fn ask_has_no_fixed_choice() {
        assert_eq!(OnConflict::Ask.fixed_choice(), None);
        assert_eq!(OnConflict::Skip.fixed_choice(), Some(BulkChoice::Skip));
    }
}
