//! 契約・統合テスト共通ヘルパー

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use nova_ledger::config::{AuthConfig, ServerConfig};
use nova_ledger::db::ledger::SqliteLedgerStore;
use nova_ledger::db::migrations::initialize_database;
use nova_ledger::ledger::LedgerWriterConfig;
use nova_ledger::{api, AppState};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// テスト用JWTシークレット
pub const TEST_SECRET: &str = "test-secret-key";

/// テスト用APIプレフィックス
pub const TEST_PREFIX: &str = "/api/v1";

/// テスト用の台帳サーバー一式
pub struct TestLedger {
    pub app: Router,
    pub pool: SqlitePool,
    pub state: AppState,
    _dir: TempDir,
}

/// テスト用サーバー設定
pub fn test_config(database_url: &str, auth_disabled: bool, api_prefix: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: database_url.to_string(),
        api_prefix: api_prefix.to_string(),
        cors_origins: vec!["http://localhost:3000".to_string()],
        auth: AuthConfig {
            disabled: auth_disabled,
            secret_key: TEST_SECRET.to_string(),
            access_token_expire_minutes: 60,
        },
        writer: LedgerWriterConfig::default(),
    }
}

/// ファイルDBを使うテスト用台帳を作成
pub async fn create_test_ledger() -> TestLedger {
    create_test_ledger_with(false, TEST_PREFIX).await
}

/// 認証有無とプレフィックスを指定してテスト用台帳を作成
pub async fn create_test_ledger_with(auth_disabled: bool, api_prefix: &str) -> TestLedger {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite:{}", dir.path().join("ledger.db").display());
    let pool = initialize_database(&url)
        .await
        .expect("Failed to initialize test database");

    let config = test_config(&url, auth_disabled, api_prefix);
    let state = AppState::new(Arc::new(SqliteLedgerStore::new(pool.clone())), &config);
    let app = api::create_app(state.clone());

    TestLedger {
        app,
        pool,
        state,
        _dir: dir,
    }
}

/// テスト用ベアラートークンを発行
pub fn bearer_token(subject: &str) -> String {
    nova_ledger::auth::jwt::create_jwt(subject, TEST_SECRET, 60).expect("Failed to create JWT")
}

/// リクエストを送り、ステータスとJSONボディを返す
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

/// 認証付きGETリクエスト
pub fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// 認証付きPOST（JSON）リクエスト
pub fn post_json(uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// 判定ログを1件追記してボディを返す
pub async fn append(app: &Router, token: &str, prompt: &str, verdict: &str) -> Value {
    let body = serde_json::json!({
        "request_data": {"prompt": prompt},
        "response_data": {"reply": format!("reply to {}", prompt)},
        "verdict": verdict,
    });
    let (status, value) = send(app, post_json("/api/v1/logs", token, &body)).await;
    assert_eq!(status, StatusCode::CREATED, "append failed: {}", value);
    value
}

/// 追記専用トリガーを外して行を書き換える（改ざんの再現）
pub async fn tamper(pool: &SqlitePool, sql: &str) {
    sqlx::query("DROP TRIGGER IF EXISTS ledger_entries_no_update")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(sql).execute(pool).await.unwrap();
}
