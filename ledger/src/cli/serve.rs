//! serve サブコマンド
//!
//! 台帳サーバーを起動します。

use crate::config::{get_env_with_fallback_or, get_env_with_fallback_parse};
use clap::Args;

/// serve サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Listen port
    #[arg(short, long, default_value = "8000", env = "NOVA_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "NOVA_HOST")]
    pub host: String,
}

impl ServeArgs {
    /// サブコマンド省略時の引数を環境変数から構築
    pub fn from_env() -> Self {
        Self {
            port: get_env_with_fallback_parse("NOVA_PORT", "PORT", 8000),
            host: get_env_with_fallback_or("NOVA_HOST", "HOST", "0.0.0.0"),
        }
    }
}
