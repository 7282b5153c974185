//! チェーン検証API Contract Tests
//!
//! GET /logs/verify-chain

use crate::support::{append, bearer_token, create_test_ledger, get, send, tamper};
use axum::http::StatusCode;

#[tokio::test]
async fn verify_empty_ledger() {
    let ledger = create_test_ledger().await;
    let token = bearer_token("auditor");

    let (status, body) = send(&ledger.app, get("/api/v1/logs/verify-chain", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Log chain is empty.");
    assert_eq!(body["logsChecked"], 0);
}

#[tokio::test]
async fn verify_intact_chain() {
    let ledger = create_test_ledger().await;
    let token = bearer_token("auditor");
    for i in 0..3 {
        append(&ledger.app, &token, &format!("p{}", i), "ALLOWED").await;
    }

    let (status, body) = send(&ledger.app, get("/api/v1/logs/verify-chain", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Log chain integrity verified.");
    assert_eq!(body["logsChecked"], 3);
}

#[tokio::test]
async fn verify_reports_tampered_verdict() {
    let ledger = create_test_ledger().await;
    let token = bearer_token("auditor");
    for verdict in ["ALLOWED", "BLOCKED", "ALLOWED"] {
        append(&ledger.app, &token, verdict, verdict).await;
    }
    tamper(
        &ledger.pool,
        "UPDATE ledger_entries SET verdict = 'ALLOWED' WHERE id = 2",
    )
    .await;

    let (status, body) = send(&ledger.app, get("/api/v1/logs/verify-chain", &token)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["fault"], "tamper_detected");
    assert_eq!(body["entryId"], 2);
    assert_eq!(body["logsChecked"], 1);
    assert_eq!(body["message"], "Data tampering at log ID 2.");
}

#[tokio::test]
async fn verify_reports_broken_link() {
    let ledger = create_test_ledger().await;
    let token = bearer_token("auditor");
    for i in 0..3 {
        append(&ledger.app, &token, &format!("p{}", i), "ALLOWED").await;
    }
    tamper(
        &ledger.pool,
        "UPDATE ledger_entries SET previous_entry_hash = 'ffff' WHERE id = 3",
    )
    .await;

    let (status, body) = send(&ledger.app, get("/api/v1/logs/verify-chain", &token)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["fault"], "chain_link_broken");
    assert_eq!(body["entryId"], 3);
    assert_eq!(body["logsChecked"], 2);
}

#[tokio::test]
async fn verify_reports_genesis_with_previous_hash() {
    let ledger = create_test_ledger().await;
    let token = bearer_token("auditor");
    append(&ledger.app, &token, "first", "ALLOWED").await;
    tamper(
        &ledger.pool,
        "UPDATE ledger_entries SET previous_entry_hash = 'abcd' WHERE id = 1",
    )
    .await;

    let (status, body) = send(&ledger.app, get("/api/v1/logs/verify-chain", &token)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["fault"], "genesis_invalid");
    assert_eq!(
        body["message"],
        "Chain broken: Genesis block has a previous_log_hash."
    );
}
