//! 判定ログAPIハンドラー
//!
//! `/logs` 系のエンドポイント

use super::error::AppError;
use crate::common::auth::Claims;
use crate::common::error::LedgerError;
use crate::ledger::hash_chain::{self, ChainReport};
use crate::ledger::types::{ChainFault, LedgerEntry, LedgerFilter, NewLedgerEntry};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

/// 判定ログ一覧取得のクエリパラメータ
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQueryParams {
    /// 判定ラベルでフィルタ
    pub verdict: Option<String>,
    /// ページ番号（1始まり、デフォルト: 1）
    pub page: Option<i64>,
    /// ページあたり件数（デフォルト: 50）
    #[serde(alias = "per_page")]
    pub per_page: Option<i64>,
}

impl From<LogQueryParams> for LedgerFilter {
    fn from(params: LogQueryParams) -> Self {
        Self {
            verdict: params.verdict.filter(|v| !v.is_empty()),
            page: params.page,
            per_page: params.per_page,
        }
    }
}

/// 判定ログ一覧レスポンス
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogListResponse {
    /// エントリ一覧（新しい順）
    pub items: Vec<LedgerEntry>,
    /// 総件数
    pub total: i64,
    /// 現在のページ番号
    pub page: i64,
    /// ページあたり件数
    pub per_page: i64,
}

/// チェーン検証レスポンス
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResponse {
    /// `ok` または `error`
    pub status: String,
    /// 人間向けメッセージ
    pub message: String,
    /// 障害前までに検証できたエントリ数
    pub logs_checked: i64,
    /// 障害種別
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
    /// 障害が検出されたエントリID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<i64>,
}

fn fault_message(fault: &ChainFault) -> String {
    match fault {
        ChainFault::GenesisInvalid { .. } => {
            "Chain broken: Genesis block has a previous_log_hash.".to_string()
        }
        ChainFault::ChainLinkBroken { entry_id } => {
            format!("Chain link broken at log ID {}.", entry_id)
        }
        ChainFault::TamperDetected { entry_id } => {
            format!("Data tampering at log ID {}.", entry_id)
        }
    }
}

impl From<ChainReport> for VerificationResponse {
    fn from(report: ChainReport) -> Self {
        match report.fault {
            None => Self {
                status: "ok".to_string(),
                message: if report.entries_checked == 0 {
                    "Log chain is empty.".to_string()
                } else {
                    "Log chain integrity verified.".to_string()
                },
                logs_checked: report.entries_checked,
                fault: None,
                entry_id: None,
            },
            Some(fault) => Self {
                status: "error".to_string(),
                message: fault_message(&fault),
                logs_checked: report.entries_checked,
                fault: Some(fault.kind().to_string()),
                entry_id: Some(fault.entry_id()),
            },
        }
    }
}

/// POST /logs - 判定ログを追記
pub async fn create_log(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<NewLedgerEntry>, JsonRejection>,
) -> Result<(StatusCode, Json<LedgerEntry>), AppError> {
    let Json(entry) = payload?;
    let entry = state.writer.append(entry).await?;
    tracing::info!(
        subject = %claims.sub,
        entry_id = entry.id,
        verdict = %entry.verdict,
        "Decision recorded"
    );
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /logs/{id} - 判定ログを取得
pub async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LedgerEntry>, AppError> {
    state
        .store
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError(LedgerError::NotFound(format!("Log with ID {} not found.", id))))
}

/// GET /logs/{id}/report - 監査レポート（単一エントリ）
pub async fn get_audit_report(
    state: State<AppState>,
    id: Path<i64>,
) -> Result<Json<LedgerEntry>, AppError> {
    get_log(state, id).await
}

/// GET /logs - 判定ログ一覧取得（新しい順）
pub async fn list_logs(
    State(state): State<AppState>,
    Query(params): Query<LogQueryParams>,
) -> Result<Json<LogListResponse>, AppError> {
    let filter: LedgerFilter = params.into();
    let (per_page, offset) = crate::db::traits::page_bounds(&filter);

    let items = state.store.list(&filter).await?;
    let total = state.store.count(&filter).await?;

    Ok(Json(LogListResponse {
        items,
        total,
        page: offset / per_page + 1,
        per_page,
    }))
}

/// GET /logs/verify-chain - ハッシュチェーン検証
///
/// 障害検出時は500で障害種別とエントリIDを返す。
pub async fn verify_log_chain(State(state): State<AppState>) -> Result<Response, AppError> {
    let report = hash_chain::verify_chain(state.store.as_ref()).await?;
    let status = if report.is_valid() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(VerificationResponse::from(report))).into_response())
}
