//! 判定集計API Contract Tests
//!
//! GET /analytics/summary

use crate::support::{append, bearer_token, create_test_ledger, get, send};
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn summary_of_empty_ledger() {
    let ledger = create_test_ledger().await;
    let token = bearer_token("analyst");

    let (status, body) = send(&ledger.app, get("/api/v1/analytics/summary", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "totalRequests": 0,
            "blockedRequests": 0,
            "allowedRequests": 0,
            "blockRatePercentage": 0.0
        })
    );
}

#[tokio::test]
async fn summary_counts_non_blocked_as_allowed() {
    let ledger = create_test_ledger().await;
    let token = bearer_token("analyst");
    append(&ledger.app, &token, "a", "ALLOWED").await;
    append(&ledger.app, &token, "b", "BLOCKED").await;
    append(&ledger.app, &token, "c", "FLAGGED").await;

    let (status, body) = send(&ledger.app, get("/api/v1/analytics/summary", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalRequests"], 3);
    assert_eq!(body["blockedRequests"], 1);
    assert_eq!(body["allowedRequests"], 2);
    assert_eq!(body["blockRatePercentage"], 33.33);
}
