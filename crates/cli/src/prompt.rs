use chrono::{DateTime, Local};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use fbatch_core::{
    ConflictDescriptor, ConflictPrompt, Decision, EntryMeta, PromptCancelled, Resolution,
};

/// Asks on the terminal. Esc or Ctrl-C at any question cancels the whole transfer.
#[derive(Default)]
pub struct TerminalPrompt {
    theme: ColorfulTheme,
}

impl ConflictPrompt for TerminalPrompt {
    fn request_resolution(
        &mut self,
        conflict: &ConflictDescriptor,
    ) -> Result<Decision, PromptCancelled> {
        eprintln!(
            "競合: {}\n  転送元: {}\n  既存:   {}",
            conflict.existing_target_path.display(),
            describe(conflict.source_meta.as_ref()),
            describe(conflict.target_meta.as_ref()),
        );

        let choices = ["スキップ", "上書き", "名前を変えて転送"];
        let choice = Select::with_theme(&self.theme)
            .with_prompt("どうしますか? (Escでキャンセル)")
            .items(&choices)
            .default(0)
            .interact_opt()
            .map_err(|_| PromptCancelled)?
            .ok_or(PromptCancelled)?;

        let resolution = match choice {
            0 => Resolution::Skip,
            1 => Resolution::Replace,
            _ => {
                let name: String = Input::with_theme(&self.theme)
                    .with_prompt("新しい名前")
                    .with_initial_text(conflict.suggested_name.clone())
                    .validate_with(|input: &String| {
                        fbatch_core::validate_name(input).map_err(|e| e.to_string())
                    })
                    .interact_text()
                    .map_err(|_| PromptCancelled)?;
                Resolution::Rename(name)
            }
        };

        let apply_to_all = Confirm::with_theme(&self.theme)
            .with_prompt("残りの競合にも同じ操作を適用しますか?")
            .default(false)
            .interact_opt()
            .map_err(|_| PromptCancelled)?
            .ok_or(PromptCancelled)?;

        Ok(Decision {
            resolution,
            apply_to_all,
        })
    }
}

fn describe(meta: Option<&EntryMeta>) -> String {
    let Some(meta) = meta else {
        return "(情報なし)".to_string();
    };
    let kind = if meta.is_dir { "フォルダ" } else { "ファイル" };
    let modified = meta
        .modified
        .as_ref()
        .map(|d: &DateTime<Local>| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("{kind} {} bytes, 更新 {modified}", meta.size)
}
