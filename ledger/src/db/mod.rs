//! データベースアクセス層
//!
//! SQLiteベースのデータ永続化

/// データベースマイグレーション
pub mod migrations;

/// 判定ログ台帳ストレージ
pub mod ledger;

/// Repository traitパターン（テスタビリティ向上）
pub mod traits;
