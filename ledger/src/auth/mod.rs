//! 認証
//!
//! トークン発行は外部の認証サービスの責務。ここでは検証のみを行う。

/// JWT生成・検証
pub mod jwt;

/// 認証ミドルウェア
pub mod middleware;
