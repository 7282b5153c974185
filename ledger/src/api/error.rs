//! APIエラーレスポンス型
//!
//! axum用の共通エラーハンドリング

use crate::common::error::{CommonError, LedgerError};
use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue},
    response::IntoResponse,
    Json,
};

/// 競合で追記を諦めたときに返す再試行待機秒数
const CONTENTION_RETRY_AFTER_SECS: &str = "1";

/// Axum用のエラーレスポンス型
#[derive(Debug)]
pub struct AppError(pub LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError(LedgerError::Common(CommonError::Validation(
            rejection.body_text(),
        )))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        // 詳細はログにのみ出力し、レスポンスには external_message() を使う
        if status.is_server_error() {
            tracing::error!(error = %self.0, status = status.as_u16(), "Request failed");
        } else {
            tracing::warn!(error = %self.0, status = status.as_u16(), "Request rejected");
        }

        let mut response = (status, Json(self.0.to_error_response())).into_response();
        if matches!(self.0, LedgerError::ContentionExceeded { .. }) {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from_static(CONTENTION_RETRY_AFTER_SECS),
            );
        }
        response
    }
}
