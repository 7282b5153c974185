//! 共通型定義
//!
//! エラー型と認証クレーム

/// 認証クレーム
pub mod auth;

/// エラー型
pub mod error;
