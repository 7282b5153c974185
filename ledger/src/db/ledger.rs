//! 判定ログ台帳ストレージ（SQLite）

use crate::common::error::{LedgerError, LedgerResult};
use crate::db::traits::{page_bounds, LedgerStore};
use crate::ledger::types::{
    ChainFault, InsertOutcome, LedgerEntry, LedgerFilter, PendingEntry, VerdictCounts,
    VERDICT_BLOCKED,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use futures::stream::{BoxStream, StreamExt};
use serde_json::{Map, Value};
use sqlx::SqlitePool;

const SELECT_COLUMNS: &str = "SELECT id, request_data, response_data, verdict, entry_hash, \
     previous_entry_hash, created_at FROM ledger_entries";

/// 末尾ハッシュが期待値と一致する場合のみ挿入する単一ステートメント
///
/// 空の台帳の末尾は `''` として比較する。
const INSERT_IF_TAIL: &str = "INSERT INTO ledger_entries \
     (request_data, response_data, verdict, entry_hash, previous_entry_hash, created_at) \
     SELECT ?, ?, ?, ?, ?, ? \
     WHERE COALESCE((SELECT entry_hash FROM ledger_entries ORDER BY id DESC LIMIT 1), '') = ? \
     RETURNING id";

/// 判定ログ台帳のSQLite実装
#[derive(Clone)]
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

/// sqlx::FromRow用の行構造体
#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    id: i64,
    request_data: String,
    response_data: String,
    verdict: String,
    entry_hash: String,
    previous_entry_hash: Option<String>,
    created_at: String,
}

/// 保存済みペイロードをJSONオブジェクトに復元
///
/// 追記経路は常にJSONオブジェクトを書き込むため、復元できない行は改ざんとみなす。
fn parse_payload(id: i64, raw: &str) -> LedgerResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(LedgerError::Integrity(ChainFault::TamperDetected {
            entry_id: id,
        })),
    }
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = LedgerError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let request_data = parse_payload(row.id, &row.request_data)?;
        let response_data = parse_payload(row.id, &row.response_data)?;
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                LedgerError::Internal(format!(
                    "Failed to parse created_at of entry {}: {}",
                    row.id, e
                ))
            })?;

        Ok(LedgerEntry {
            id: row.id,
            request_data,
            response_data,
            verdict: row.verdict,
            entry_hash: row.entry_hash,
            previous_entry_hash: row.previous_entry_hash,
            created_at,
        })
    }
}

impl SqliteLedgerStore {
    /// 新しいストレージインスタンスを作成
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 接続プールへの参照
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn tail(&self) -> LedgerResult<Option<LedgerEntry>> {
        let sql = format!("{} ORDER BY id DESC LIMIT 1", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, LedgerRow>(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LedgerError::StorageUnavailable(format!("Failed to read tail: {}", e)))?;
        row.map(LedgerEntry::try_from).transpose()
    }

    async fn get(&self, id: i64) -> LedgerResult<Option<LedgerEntry>> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, LedgerRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                LedgerError::StorageUnavailable(format!("Failed to get ledger entry: {}", e))
            })?;
        row.map(LedgerEntry::try_from).transpose()
    }

    async fn insert_if_tail(
        &self,
        entry: &PendingEntry,
        expected_tail: Option<&str>,
    ) -> LedgerResult<InsertOutcome> {
        let request_data = serde_json::to_string(&entry.request_data)
            .map_err(|e| LedgerError::Encoding(e.to_string()))?;
        let response_data = serde_json::to_string(&entry.response_data)
            .map_err(|e| LedgerError::Encoding(e.to_string()))?;
        // 保存形式（マイクロ秒）に揃え、読み戻した値と一致させる
        let created_at = Utc::now().trunc_subsecs(6);

        let result = sqlx::query_scalar::<_, i64>(INSERT_IF_TAIL)
            .bind(&request_data)
            .bind(&response_data)
            .bind(&entry.verdict)
            .bind(&entry.entry_hash)
            .bind(entry.previous_entry_hash.as_deref())
            .bind(created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
            .bind(expected_tail.unwrap_or(""))
            .fetch_optional(&self.pool)
            .await;

        match result {
            Ok(Some(id)) => Ok(InsertOutcome::Committed(LedgerEntry {
                id,
                request_data: entry.request_data.clone(),
                response_data: entry.response_data.clone(),
                verdict: entry.verdict.clone(),
                entry_hash: entry.entry_hash.clone(),
                previous_entry_hash: entry.previous_entry_hash.clone(),
                created_at,
            })),
            Ok(None) => Ok(InsertOutcome::TailMoved),
            // 同一の先行ハッシュを持つエントリが既に存在する（フォーク防止インデックス）
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                tracing::debug!(
                    entry_hash = %entry.entry_hash,
                    "Conditional insert rejected by unique index"
                );
                Ok(InsertOutcome::TailMoved)
            }
            Err(e) => Err(LedgerError::StorageUnavailable(format!(
                "Failed to insert ledger entry: {}",
                e
            ))),
        }
    }

    fn scan(&self) -> BoxStream<'_, LedgerResult<LedgerEntry>> {
        sqlx::query_as::<_, LedgerRow>(
            "SELECT id, request_data, response_data, verdict, entry_hash, \
             previous_entry_hash, created_at FROM ledger_entries ORDER BY id ASC",
        )
        .fetch(&self.pool)
        .map(|row| {
            row.map_err(|e| {
                LedgerError::StorageUnavailable(format!("Failed to scan ledger: {}", e))
            })
            .and_then(LedgerEntry::try_from)
        })
        .boxed()
    }

    async fn list(&self, filter: &LedgerFilter) -> LedgerResult<Vec<LedgerEntry>> {
        let (limit, offset) = page_bounds(filter);
        let sql = format!(
            "{} WHERE (? IS NULL OR verdict = ?) ORDER BY id DESC LIMIT ? OFFSET ?",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, LedgerRow>(&sql)
            .bind(filter.verdict.as_deref())
            .bind(filter.verdict.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                LedgerError::StorageUnavailable(format!("Failed to list ledger entries: {}", e))
            })?;
        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    async fn count(&self, filter: &LedgerFilter) -> LedgerResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM ledger_entries WHERE (? IS NULL OR verdict = ?)",
        )
        .bind(filter.verdict.as_deref())
        .bind(filter.verdict.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LedgerError::StorageUnavailable(format!("Failed to count entries: {}", e)))
    }

    async fn verdict_counts(&self) -> LedgerResult<VerdictCounts> {
        let (total, blocked) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN verdict = ? THEN 1 ELSE 0 END), 0) \
             FROM ledger_entries",
        )
        .bind(VERDICT_BLOCKED)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            LedgerError::StorageUnavailable(format!("Failed to count verdicts: {}", e))
        })?;
        Ok(VerdictCounts { total, blocked })
    }
}
