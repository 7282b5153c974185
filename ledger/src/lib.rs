//! Nova decision ledger
//!
//! ゲートウェイの判定（ALLOWED / BLOCKED）を記録する改ざん検知可能な追記専用台帳

#![warn(missing_docs)]

/// 共通型定義
pub mod common;

/// REST APIハンドラー
pub mod api;

/// 認証（JWT検証）
pub mod auth;

/// CLIインターフェース
pub mod cli;

/// 設定管理（環境変数ヘルパー）
pub mod config;

/// データベースアクセス
pub mod db;

/// 判定ログ台帳（正準化・ハッシュチェーン・追記サービス）
pub mod ledger;

/// 台帳プロセスの排他制御（シングルライター制約）
pub mod lock;

/// ロギング初期化ユーティリティ
pub mod logging;

/// axumサーバー起動・シャットダウン
pub mod server;

use std::sync::Arc;

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    /// 台帳ストア
    pub store: Arc<dyn db::traits::LedgerStore>,
    /// 追記サービス
    pub writer: Arc<ledger::writer::LedgerWriter>,
    /// JWT秘密鍵
    pub jwt_secret: String,
    /// 認証無効化モード
    pub auth_disabled: bool,
    /// APIプレフィックス（空文字列ならルート直下）
    pub api_prefix: String,
    /// CORS許可オリジン
    pub cors_origins: Vec<String>,
}

impl AppState {
    /// ストアとサーバー設定からアプリケーション状態を構築
    pub fn new(store: Arc<dyn db::traits::LedgerStore>, config: &config::ServerConfig) -> Self {
        let writer = Arc::new(ledger::writer::LedgerWriter::new(
            store.clone(),
            config.writer.clone(),
        ));
        Self {
            store,
            writer,
            jwt_secret: config.auth.secret_key.clone(),
            auth_disabled: config.auth.disabled,
            api_prefix: config.api_prefix.clone(),
            cors_origins: config.cors_origins.clone(),
        }
    }
}
