//! データベース初期化とマイグレーション実行

use crate::common::error::{CommonError, LedgerError, LedgerResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 書き込み競合時にSQLiteがロック解放を待つ時間
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// 接続プールの最大接続数
const MAX_CONNECTIONS: u32 = 8;

fn connect_options(database_url: &str) -> LedgerResult<SqliteConnectOptions> {
    SqliteConnectOptions::from_str(database_url)
        .map(|options| options.create_if_missing(true).busy_timeout(BUSY_TIMEOUT))
        .map_err(|e| {
            LedgerError::Common(CommonError::Config(format!(
                "Invalid database URL {}: {}",
                database_url, e
            )))
        })
}

/// データベースURLが指すファイルパス（インメモリDBは`None`）
pub fn database_file(database_url: &str) -> LedgerResult<Option<PathBuf>> {
    let options = connect_options(database_url)?;
    let filename = options.get_filename();
    if database_url.contains(":memory:") || filename.as_os_str().is_empty() {
        return Ok(None);
    }
    Ok(Some(filename.to_path_buf()))
}

/// SQLiteデータベース接続プールを作成してマイグレーションを実行
///
/// # Arguments
/// * `database_url` - データベースURL（例: "sqlite:data/ledger.db"）
///
/// # Returns
/// * `Ok(SqlitePool)` - 初期化済みデータベースプール
/// * `Err(LedgerError)` - 初期化失敗
pub async fn initialize_database(database_url: &str) -> LedgerResult<SqlitePool> {
    let mut options = connect_options(database_url)?;

    if let Some(path) = database_file(database_url)? {
        // SQLiteファイルはディレクトリが存在しないと作成できないため、先に作成しておく
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                LedgerError::StorageUnavailable(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    tracing::info!(database_url = %database_url, "Opening ledger database");
    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .map_err(|e| {
            LedgerError::StorageUnavailable(format!("Failed to connect to database: {}", e))
        })?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// 既存の台帳データベースを読み取り専用で開く
///
/// ファイルの作成・マイグレーションは行わない。ファイルが存在しない場合や
/// インメモリDBを指す場合はエラー。
pub async fn open_database_read_only(database_url: &str) -> LedgerResult<SqlitePool> {
    let path = database_file(database_url)?.ok_or_else(|| {
        CommonError::Config(format!(
            "An on-disk ledger database is required: {}",
            database_url
        ))
    })?;
    if !path.is_file() {
        return Err(LedgerError::StorageUnavailable(format!(
            "Ledger database not found: {}",
            path.display()
        )));
    }

    let options = connect_options(database_url)?
        .create_if_missing(false)
        .read_only(true);

    tracing::info!(database_url = %database_url, "Opening ledger database read-only");
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| {
            LedgerError::StorageUnavailable(format!("Failed to open database read-only: {}", e))
        })
}

/// マイグレーションを実行（sqlx::migrate!マクロを使用）
pub async fn run_migrations(pool: &SqlitePool) -> LedgerResult<()> {
    tracing::info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| LedgerError::StorageUnavailable(format!("Failed to run migrations: {}", e)))?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
