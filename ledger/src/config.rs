//! Configuration management via environment variables
//!
//! `NOVA_*` names are preferred. The unprefixed names used by earlier
//! deployments (`DATABASE_URL`, `SECRET_KEY`, ...) are still honoured with a
//! deprecation warning.

use crate::common::error::{CommonError, LedgerResult};
use crate::ledger::writer::{AppendMode, LedgerWriterConfig};
use std::path::PathBuf;

/// デフォルトのAPIプレフィックス
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// デフォルトのCORS許可オリジン
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:8000"];

/// デフォルトのアクセストークン有効期限（分）
pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 60;

/// Get an environment variable with fallback to a deprecated name
///
/// Returns the new variable if set, otherwise the old one (with a
/// deprecation warning), otherwise `None`.
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback and default value
pub fn get_env_with_fallback_or(new_name: &str, old_name: &str, default: &str) -> String {
    get_env_with_fallback(new_name, old_name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable with fallback, parsing to a specific type
///
/// Unparseable values fall back to `default`.
pub fn get_env_with_fallback_parse<T: std::str::FromStr>(
    new_name: &str,
    old_name: &str,
    default: T,
) -> T {
    get_env_with_fallback(new_name, old_name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// 認証無効化モードの有効/無効を取得
///
/// 環境変数 `NOVA_AUTH_DISABLED`（旧: `AUTH_DISABLED`）が `true/1/yes/on` のときに有効化する。
pub fn is_auth_disabled() -> bool {
    get_env_with_fallback("NOVA_AUTH_DISABLED", "AUTH_DISABLED")
        .map(|value| is_truthy(&value))
        .unwrap_or(false)
}

/// データベースURLを取得
///
/// 未設定の場合は `~/.nova/ledger.db`（ホームが取れない場合はカレント）を使う。
pub fn get_database_url() -> String {
    get_env_with_fallback("NOVA_DATABASE_URL", "DATABASE_URL").unwrap_or_else(|| {
        let path = nova_home_dir().join("ledger.db");
        format!("sqlite:{}", path.display())
    })
}

/// データディレクトリ（`~/.nova`）
pub fn nova_home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nova")
}

/// APIプレフィックスを取得（先頭スラッシュ付き、末尾スラッシュなし）
pub fn get_api_prefix() -> String {
    normalize_prefix(&get_env_with_fallback_or(
        "NOVA_API_PREFIX",
        "API_V1_STR",
        DEFAULT_API_PREFIX,
    ))
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// CORS許可オリジンを取得（カンマ区切り）
pub fn get_cors_origins() -> Vec<String> {
    match std::env::var("NOVA_CORS_ORIGINS") {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
    }
}

/// JWT署名用シークレットを取得
pub fn get_secret_key() -> Option<String> {
    get_env_with_fallback("NOVA_SECRET_KEY", "SECRET_KEY").filter(|s| !s.is_empty())
}

/// アクセストークン有効期限（分）を取得
pub fn get_access_token_expire_minutes() -> i64 {
    get_env_with_fallback_parse(
        "NOVA_ACCESS_TOKEN_EXPIRE_MINUTES",
        "ACCESS_TOKEN_EXPIRE_MINUTES",
        DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
    )
}

impl LedgerWriterConfig {
    /// Load append-service configuration from environment variables.
    ///
    /// An unknown `NOVA_LEDGER_APPEND_MODE` is a configuration error rather
    /// than a silent fallback.
    pub fn from_env() -> Result<Self, CommonError> {
        let defaults = Self::default();
        let mode = match std::env::var("NOVA_LEDGER_APPEND_MODE") {
            Ok(raw) => raw.parse::<AppendMode>()?,
            Err(_) => defaults.mode,
        };
        let max_retries = get_env_with_fallback_parse(
            "NOVA_LEDGER_MAX_RETRIES",
            "LEDGER_MAX_RETRIES",
            defaults.max_retries,
        );
        Ok(Self {
            mode,
            max_retries,
            ..defaults
        })
    }
}

/// 認証設定
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// 認証を無効化する（開発用）
    pub disabled: bool,
    /// JWT署名用シークレット
    pub secret_key: String,
    /// トークン有効期限（分）
    pub access_token_expire_minutes: i64,
}

impl AuthConfig {
    /// Load authentication configuration from environment variables.
    ///
    /// A secret is required unless auth is disabled.
    pub fn from_env() -> LedgerResult<Self> {
        let disabled = is_auth_disabled();
        let secret_key = match (get_secret_key(), disabled) {
            (Some(secret), _) => secret,
            (None, true) => String::new(),
            (None, false) => {
                return Err(CommonError::Config(
                    "NOVA_SECRET_KEY must be set (or NOVA_AUTH_DISABLED=true)".to_string(),
                )
                .into())
            }
        };
        Ok(Self {
            disabled,
            secret_key,
            access_token_expire_minutes: get_access_token_expire_minutes(),
        })
    }
}

/// サーバー設定
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// データベースURL
    pub database_url: String,
    /// APIプレフィックス
    pub api_prefix: String,
    /// CORS許可オリジン
    pub cors_origins: Vec<String>,
    /// 認証設定
    pub auth: AuthConfig,
    /// 追記サービス設定
    pub writer: LedgerWriterConfig,
}

impl ServerConfig {
    /// 環境変数とCLI引数から設定を構築
    pub fn from_args(host: String, port: u16) -> LedgerResult<Self> {
        Ok(Self {
            host,
            port,
            database_url: get_database_url(),
            api_prefix: get_api_prefix(),
            cors_origins: get_cors_origins(),
            auth: AuthConfig::from_env()?,
            writer: LedgerWriterConfig::from_env()?,
        })
    }

    /// `host:port` 形式のバインドアドレス
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
