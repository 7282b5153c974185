//! ロギング初期化
//!
//! 標準出力への人間向けログと、日次ローテーションするJSONログファイルを併用する。

use crate::common::error::{CommonError, CommonResult};
use crate::config::{get_env_with_fallback, nova_home_dir};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// ログファイル名のプレフィックス（`nova-ledger.log.YYYY-MM-DD`）
const LOG_FILE_PREFIX: &str = "nova-ledger.log";

/// フィルタ指定（`NOVA_LOG_LEVEL`、なければ `RUST_LOG`、デフォルト `info`）
fn level_directive(default: &str) -> String {
    get_env_with_fallback("NOVA_LOG_LEVEL", "RUST_LOG").unwrap_or_else(|| default.to_string())
}

fn env_filter(default: &str) -> EnvFilter {
    let directive = level_directive(default);
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(default))
}

/// ログ出力ディレクトリ（`NOVA_LOG_DIR`、デフォルト `~/.nova/logs`）
pub fn log_dir() -> PathBuf {
    std::env::var_os("NOVA_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| nova_home_dir().join("logs"))
}

/// サーバー用のロギングを初期化
pub fn init() -> CommonResult<()> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir).map_err(|e| {
        CommonError::Config(format!(
            "Failed to create log directory {}: {}",
            dir.display(),
            e
        ))
    })?;
    let file_appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);

    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(file_appender),
        )
        .try_init()
        .map_err(|e| CommonError::Config(format!("Failed to initialize logging: {}", e)))
}

/// CLIサブコマンド用のロギングを初期化（標準エラー出力のみ、デフォルト `warn`）
pub fn init_cli() -> CommonResult<()> {
    tracing_subscriber::registry()
        .with(env_filter("warn"))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| CommonError::Config(format!("Failed to initialize logging: {}", e)))
}
