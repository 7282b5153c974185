// 認証ミドルウェア実装

use crate::api::error::AppError;
use crate::common::auth::{Claims, ANONYMOUS_SUBJECT};
use crate::common::error::LedgerError;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Authorizationヘッダーから "Bearer {token}" を抽出してJWT検証を行う
///
/// # Arguments
/// * `State(jwt_secret)` - JWT署名検証用のシークレットキー
/// * `request` - HTTPリクエスト
/// * `next` - 次のミドルウェア/ハンドラー
///
/// # Returns
/// * `Ok(Response)` - 認証成功、requestにClaimsを追加
/// * `Err(Response)` - ヘッダー欠落・形式不正は401、トークン不正・期限切れは403
pub async fn jwt_auth_middleware(
    State(jwt_secret): State<String>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            AppError(LedgerError::Authentication(
                "Missing Authorization header".to_string(),
            ))
            .into_response()
        })?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError(LedgerError::Authentication(
                "Invalid Authorization header format".to_string(),
            ))
            .into_response()
        })?
        .to_string();

    let claims = crate::auth::jwt::verify_jwt(&token, &jwt_secret)
        .map_err(|e| AppError(e).into_response())?;

    // 検証済みのClaimsをrequestの拡張データに格納
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// NOVA_AUTH_DISABLED用の匿名Claims注入ミドルウェア
pub async fn inject_anonymous_claims(mut request: Request, next: Next) -> Response {
    let claims = Claims {
        sub: ANONYMOUS_SUBJECT.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(24)).timestamp() as usize,
    };
    request.extensions_mut().insert(claims);
    next.run(request).await
}
