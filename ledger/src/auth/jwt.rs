// JWT生成と検証（jsonwebtoken実装）

use crate::common::auth::Claims;
use crate::common::error::LedgerError;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

/// JWTトークンを生成
///
/// 通常のトークンは外部の認証サービスが発行する。運用ツールとテスト用。
///
/// # Arguments
/// * `subject` - 主体（sub claim）
/// * `secret` - JWTシークレットキー
/// * `expire_minutes` - 有効期限（分）
pub fn create_jwt(subject: &str, secret: &str, expire_minutes: i64) -> Result<String, LedgerError> {
    let expiration = Utc::now()
        .checked_add_signed(chrono::Duration::minutes(expire_minutes))
        .ok_or_else(|| LedgerError::Jwt("Failed to calculate expiration time".to_string()))?
        .timestamp()
        .max(0) as usize;

    let claims = Claims {
        sub: subject.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| LedgerError::Jwt(format!("Failed to create JWT: {}", e)))
}

/// JWTトークンを検証（HS256、有効期限必須）
///
/// # Returns
/// * `Ok(Claims)` - 検証済みクレーム
/// * `Err(LedgerError::Jwt)` - 無効なトークン、期限切れなど
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, LedgerError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| LedgerError::Jwt(format!("Failed to verify JWT: {}", e)))
}
