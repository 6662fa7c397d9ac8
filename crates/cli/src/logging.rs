//! Tracing initialization for the `fbatch` binary. Output goes to stderr so table/JSON output
//! on stdout stays clean.

use anyhow::{anyhow, Result};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt as tsfmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry;
use tracing_subscriber::util::SubscriberInitExt;

/// Shifts the configured level by `-v`/`-q` counts.
pub fn effective_level(configured: &str, verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    let base = parse_level(configured).unwrap_or(LevelFilter::WARN);
    if base == LevelFilter::OFF && verbose == 0 {
        return LevelFilter::OFF;
    }
    let ladder = [
        LevelFilter::ERROR,
        LevelFilter::WARN,
        LevelFilter::INFO,
        LevelFilter::DEBUG,
        LevelFilter::TRACE,
    ];
    let start = ladder.iter().position(|l| *l == base).unwrap_or(1);
    let index = (start + usize::from(verbose)).min(ladder.len() - 1);
    ladder[index]
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::OFF),
        "error" => Some(LevelFilter::ERROR),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "info" => Some(LevelFilter::INFO),
        "debug" => Some(LevelFilter::DEBUG),
        "trace" => Some(LevelFilter::TRACE),
        _ => None,
    }
}

/// `RUST_LOG` wins when set; otherwise the computed level applies to every target.
pub fn init_tracing(level: LevelFilter, json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_ascii_lowercase()));

    if json {
        let layer = tsfmt::layer()
            .event_format(tsfmt::format().json())
            .with_writer(std::io::stderr)
            .with_target(true);
        registry()
            .with(env_filter)
            .with(layer)
            .try_init()
            .map_err(|e| anyhow!("ログの初期化に失敗しました: {e}"))
    } else {
        let layer = tsfmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact();
        registry()
            .with(env_filter)
            .with(layer)
            .try_init()
            .map_err(|e| anyhow!("ログの初期化に失敗しました: {e}"))
    }
}
