//! 認証関連の型定義

use serde::{Deserialize, Serialize};

/// JWTクレーム
///
/// トークンは外部の認証サービスが発行する。台帳は署名と有効期限のみ検証する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// 主体（JWT sub claim）
    pub sub: String,
    /// 有効期限（Unix timestamp、JWT exp claim）
    pub exp: usize,
}

/// 認証無効化モードで注入される主体名
pub const ANONYMOUS_SUBJECT: &str = "anonymous";
