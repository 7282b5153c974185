//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! `LedgerError`は`external_message()`・`error_type()`・`status_code()`を提供し、
//! 内部詳細を漏らさないHTTPエラーレスポンスを生成できます。

use crate::ledger::types::ChainFault;
use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Common layer error type
#[derive(Debug, Error)]
pub enum CommonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Ledger error type
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Common layer error
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Payload cannot be canonically encoded (rejected before any store I/O)
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Backing store unavailable or failed
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Optimistic append retry budget exhausted
    #[error("Append contention exceeded after {attempts} attempts")]
    ContentionExceeded {
        /// 試行回数（初回を含む）
        attempts: u32,
    },

    /// Hash chain verification fault
    #[error("Integrity fault: {0}")]
    Integrity(ChainFault),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// JWT error
    #[error("JWT error: {0}")]
    Jwt(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Authorization error
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns a safe error message for external clients.
    ///
    /// Full error details (`Display`) are only written to server logs.
    pub fn external_message(&self) -> &'static str {
        match self {
            Self::Common(CommonError::Validation(_)) => "Invalid request",
            Self::Common(_) => "Request error",
            Self::Encoding(_) => "Payload cannot be canonically encoded",
            Self::StorageUnavailable(_) => "Ledger storage unavailable",
            Self::ContentionExceeded { .. } => "Ledger is busy, retry the append",
            Self::Integrity(_) => "Ledger integrity fault detected",
            Self::NotFound(_) => "Not found",
            Self::Jwt(_) => "Could not validate credentials",
            Self::Authentication(_) => "Not authenticated",
            Self::Authorization(_) => "Could not validate credentials",
            Self::Internal(_) => "Internal server error",
        }
    }

    /// Returns the machine-readable error type string.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Common(_) => "invalid_request_error",
            Self::Encoding(_) => "encoding_error",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::ContentionExceeded { .. } => "contention_exceeded",
            Self::Integrity(fault) => fault.kind(),
            Self::NotFound(_) => "not_found_error",
            Self::Jwt(_) => "permission_error",
            Self::Authentication(_) => "authentication_error",
            Self::Authorization(_) => "permission_error",
            Self::Internal(_) => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Common(_) => StatusCode::BAD_REQUEST,
            Self::Encoding(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ContentionExceeded { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            // 不正トークンは403（認証層の既存挙動に合わせる）
            Self::Jwt(_) => StatusCode::FORBIDDEN,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 呼び出し側が操作全体を再試行してよいエラーか
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable(_) | Self::ContentionExceeded { .. }
        )
    }

    /// Converts this error to a JSON error response body.
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                message: self.external_message().to_string(),
                error_type: self.error_type().to_string(),
                code: Some(self.status_code().as_u16().to_string()),
            },
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::StorageUnavailable(err.to_string())
    }
}

/// エラーレスポンス
///
/// ```json
/// {
///   "error": {
///     "message": "Ledger storage unavailable",
///     "type": "storage_unavailable",
///     "code": "503"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// The error details
    pub error: ErrorDetail,
}

/// エラー詳細
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    /// Human-readable error message
    pub message: String,
    /// Error type (e.g., "encoding_error", "tamper_detected")
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error code (HTTP status as string)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Result type alias (Common)
pub type CommonResult<T> = Result<T, CommonError>;

/// Result type alias (Ledger)
pub type LedgerResult<T> = Result<T, LedgerError>;
