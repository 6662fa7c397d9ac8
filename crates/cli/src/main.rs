mod local_fs;
mod logging;
mod pattern_arg;
mod prompt;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use fbatch_core::{
    app_paths, commit_renames, execute_plan, generate_preview, load_config, plan_transfer,
    summarize_preview, validate, AppConfig, ConflictPrompt, FixedPolicy, OnConflict, Pattern,
    PreviewItem, PreviewStats, RenameConfig, TransferKind, TransferPlan, ValidationResult,
};
use local_fs::{collect_entries, LocalFs};
use pattern_arg::parse_pattern_spec;
use prompt::TerminalPrompt;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "fbatch")]
#[command(about = "ファイル名の一括リネームと、競合を確認しながらのコピー/移動を行います")]
struct Cli {
    /// ログを詳しくします (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// エラー以外のログを出しません
    #[arg(short, long, global = true, default_value_t = false)]
    quiet: bool,
    /// ログをJSON形式で出力します
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Rename(RenameArgs),
    Copy(TransferArgs),
    Move(TransferArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
}

#[derive(Debug, Args)]
struct RenameArgs {
    dir: PathBuf,
    /// パターン定義ファイル (.toml / .json)
    #[arg(long)]
    patterns: Option<PathBuf>,
    /// 追加のパターン (例: prefix:Q1_, number:1:1:3, case:snake)
    #[arg(short = 'p', long = "pattern", value_parser = parse_pattern_spec)]
    pattern: Vec<Pattern>,
    #[arg(long, default_value_t = false)]
    recursive: bool,
    #[arg(long, default_value_t = false)]
    include_hidden: bool,
    #[arg(long, default_value_t = false)]
    folders: bool,
    #[arg(long, default_value_t = false)]
    no_files: bool,
    #[arg(long, default_value_t = false)]
    no_preserve_extension: bool,
    #[arg(long, default_value_t = false)]
    apply: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Args)]
struct TransferArgs {
    #[arg(required = true)]
    sources: Vec<PathBuf>,
    #[arg(long)]
    to: PathBuf,
    #[arg(long, value_enum)]
    on_conflict: Option<ConflictArg>,
    /// 競合の解決だけを行い、転送はしません
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConflictArg {
    Ask,
    Skip,
    Replace,
    Rename,
}

impl From<ConflictArg> for OnConflict {
    fn from(value: ConflictArg) -> Self {
        match value {
            ConflictArg::Ask => OnConflict::Ask,
            ConflictArg::Skip => OnConflict::Skip,
            ConflictArg::Replace => OnConflict::Replace,
            ConflictArg::Rename => OnConflict::Rename,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config()?;
    logging::init_tracing(
        logging::effective_level(&config.log_level, cli.verbose, cli.quiet),
        cli.log_json,
    )?;

    match cli.command {
        Commands::Rename(args) => cmd_rename(args, &config),
        Commands::Copy(args) => cmd_transfer(args, TransferKind::Copy, &config),
        Commands::Move(args) => cmd_transfer(args, TransferKind::Move, &config),
        Commands::Config(config_args) => match config_args.action {
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

fn cmd_rename(args: RenameArgs, defaults: &AppConfig) -> Result<()> {
    let recursive = args.recursive || defaults.recursive_default;
    let include_hidden = args.include_hidden || defaults.include_hidden_default;

    let mut rename_config = match args.patterns.as_deref() {
        Some(path) => load_rename_config(path)?,
        None => RenameConfig {
            patterns: Vec::new(),
            apply_to_folders: defaults.apply_to_folders,
            apply_to_files: defaults.apply_to_files,
            preserve_extension: defaults.preserve_extension,
        },
    };
    rename_config.patterns.extend(args.pattern);
    if args.folders {
        rename_config.apply_to_folders = true;
    }
    if args.no_files {
        rename_config.apply_to_files = false;
    }
    if args.no_preserve_extension {
        rename_config.preserve_extension = false;
    }

    if recursive && rename_config.apply_to_folders {
        bail!("再帰モードではフォルダのリネームはできません。--recursive か --folders のどちらかを外してください。");
    }
    if rename_config.patterns.is_empty() {
        bail!("パターンが指定されていません。--pattern か --patterns を指定してください。");
    }

    let entries = collect_entries(&args.dir, recursive, include_hidden)?;
    let preview = generate_preview(&entries, &rename_config);
    let validation = validate(&preview);
    let stats = summarize_preview(&entries, &preview);

    match args.output {
        OutputFormat::Json => {
            let body = json!({
                "preview": preview,
                "validation": validation,
                "stats": stats,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Table => print_preview(&preview, &validation, &stats),
    }

    if args.apply {
        if validation.has_duplicates() {
            bail!("リネーム後の名前が重複しているため適用できません。");
        }
        let result = commit_renames(&preview, &mut LocalFs)?;
        eprintln!(
            "適用完了: {}件 (変更なし {}件, エラーでスキップ {}件)",
            result.applied, result.unchanged, result.skipped
        );
    } else {
        eprintln!("dry-runモード: 実ファイルは変更していません。適用するには --apply を指定してください。");
    }

    Ok(())
}

fn load_rename_config(path: &Path) -> Result<RenameConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("パターン定義を読めませんでした: {}", path.display()))?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        RenameConfig::from_json_str(&raw)
    } else {
        RenameConfig::from_toml_str(&raw)
    }
}

fn cmd_transfer(args: TransferArgs, kind: TransferKind, defaults: &AppConfig) -> Result<()> {
    if !args.to.is_dir() {
        bail!("転送先フォルダが存在しません: {}", args.to.display());
    }

    let on_conflict = args
        .on_conflict
        .map(OnConflict::from)
        .unwrap_or(defaults.on_conflict);
    let mut prompt: Box<dyn ConflictPrompt> = match on_conflict.fixed_choice() {
        Some(choice) => Box::new(FixedPolicy(choice)),
        None => Box::new(TerminalPrompt::default()),
    };

    let mut local = LocalFs;
    let plan = plan_transfer(&args.sources, &args.to, kind, &local, prompt.as_mut())?;

    if args.dry_run {
        match args.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
            OutputFormat::Table => print_plan(&plan),
        }
        eprintln!("dry-runモード: 実ファイルは変更していません。");
        return Ok(());
    }

    let summary = execute_plan(&plan, &mut local)?;
    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Table => {
            for failure in &summary.failed {
                println!("失敗: {} ({})", failure.source.display(), failure.message);
            }
            println!(
                "完了: 処理 {}件, スキップ {}件, 失敗 {}件",
                summary.processed,
                summary.skipped,
                summary.failed.len()
            );
        }
    }
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let paths = app_paths()?;
    println!("設定ファイル: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn print_preview(preview: &[PreviewItem], validation: &ValidationResult, stats: &PreviewStats) {
    println!("元の名前 -> 新しい名前");
    for item in preview {
        match &item.error_message {
            Some(message) => println!("{} -> (エラー: {})", item.original_path.display(), message),
            None => println!("{} -> {}", item.original_path.display(), item.new_name),
        }
    }

    for issue in &validation.errors {
        println!("エラー: {}", issue.message);
    }
    for issue in &validation.warnings {
        println!("警告: {}", issue.message);
    }

    println!(
        "\n集計: scanned={} filtered_out={} planned={} unchanged={} errors={}",
        stats.scanned, stats.filtered_out, stats.planned, stats.unchanged, stats.errors
    );
}

fn print_plan(plan: &TransferPlan) {
    let dest = plan.destination_dir.display();
    for source in plan.to_copy.iter().chain(&plan.to_move) {
        println!("{} -> {}", source.display(), dest);
    }
    for item in &plan.to_rename_copy {
        println!(
            "{} -> {} (名前を変更)",
            item.source.display(),
            plan.destination_dir.join(&item.new_name).display()
        );
    }
    for source in &plan.skipped {
        println!("{} (スキップ)", source.display());
    }
}
