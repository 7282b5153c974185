//! 判定集計APIハンドラー

use super::error::AppError;
use crate::ledger::types::VerdictCounts;
use crate::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// 集計サマリーレスポンス
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummaryResponse {
    /// 総リクエスト数
    pub total_requests: i64,
    /// BLOCKED判定数
    pub blocked_requests: i64,
    /// BLOCKED以外の判定数
    pub allowed_requests: i64,
    /// ブロック率（%、小数第2位で丸め）
    pub block_rate_percentage: f64,
}

impl From<VerdictCounts> for AnalyticsSummaryResponse {
    fn from(counts: VerdictCounts) -> Self {
        let block_rate = if counts.total > 0 {
            counts.blocked as f64 / counts.total as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_requests: counts.total,
            blocked_requests: counts.blocked,
            allowed_requests: counts.total - counts.blocked,
            block_rate_percentage: (block_rate * 100.0).round() / 100.0,
        }
    }
}

/// GET /analytics/summary - 判定集計サマリー
pub async fn get_summary(
    State(state): State<AppState>,
) -> Result<Json<AnalyticsSummaryResponse>, AppError> {
    let counts = state.store.verdict_counts().await?;
    Ok(Json(counts.into()))
}
