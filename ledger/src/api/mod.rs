//! REST APIハンドラー
//!
//! ルーティングとミドルウェアの組み立て

/// 判定集計
pub mod analytics;

/// APIエラーレスポンス
pub mod error;

/// 判定ログ
pub mod logs;

use crate::auth::middleware::{inject_anonymous_claims, jwt_auth_middleware};
use crate::AppState;
use axum::{
    http::HeaderValue,
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// ヘルスチェック用メッセージ
pub const HEALTH_MESSAGE: &str = "Nova ledger API is operational.";

/// GET / - ヘルスチェック
async fn health() -> Json<Value> {
    Json(json!({ "message": HEALTH_MESSAGE }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// アプリケーションルーターを構築
///
/// `/logs` と `/analytics` はAPIプレフィックス配下で認証必須。`/` は認証不要。
pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/logs", get(logs::list_logs).post(logs::create_log))
        .route("/logs/verify-chain", get(logs::verify_log_chain))
        .route("/logs/{id}", get(logs::get_log))
        .route("/logs/{id}/report", get(logs::get_audit_report))
        .route("/analytics/summary", get(analytics::get_summary));

    let protected = if state.auth_disabled {
        tracing::warn!("Authentication is disabled; all ledger routes are open");
        protected.layer(axum_middleware::from_fn(inject_anonymous_claims))
    } else {
        protected.layer(axum_middleware::from_fn_with_state(
            state.jwt_secret.clone(),
            jwt_auth_middleware,
        ))
    };

    let api = if state.api_prefix.is_empty() {
        protected
    } else {
        Router::new().nest(&state.api_prefix, protected)
    };

    Router::new()
        .route("/", get(health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.cors_origins))
        .with_state(state)
}
