//! 判定ログAPI Contract Tests
//!
//! POST /logs, GET /logs, GET /logs/{id}, GET /logs/{id}/report

use crate::support::{append, bearer_token, create_test_ledger, get, post_json, send};
use axum::http::StatusCode;
use serde_json::json;

const GENESIS_HASH: &str = "d0fd39cb608d4d98829c2f3986a8b41900d486f0b3dacc1dfc59d6dade34884d";
const SECOND_HASH: &str = "338315942496904459d93a384fcc4e95dff0da3bf4e5c29609946673b92cd1ec";

#[tokio::test]
async fn post_logs_creates_genesis_entry() {
    let ledger = create_test_ledger().await;
    let token = bearer_token("gateway");

    let body = json!({
        "request_data": {"prompt": "x"},
        "response_data": {"reply": "y"},
        "verdict": "ALLOWED"
    });
    let (status, entry) = send(&ledger.app, post_json("/api/v1/logs", &token, &body)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["id"], 1);
    assert_eq!(entry["entryHash"], GENESIS_HASH);
    assert!(entry["previousEntryHash"].is_null());
    assert_eq!(entry["requestData"], json!({"prompt": "x"}));
    assert!(entry["createdAt"].is_string());
}

#[tokio::test]
async fn post_logs_links_to_previous_entry() {
    let ledger = create_test_ledger().await;
    let token = bearer_token("gateway");

    let first = json!({
        "requestData": {"prompt": "x"},
        "responseData": {"reply": "y"},
        "verdict": "ALLOWED"
    });
    let second = json!({
        "requestData": {"prompt": "second"},
        "responseData": {"reply": "z"},
        "verdict": "BLOCKED"
    });
    send(&ledger.app, post_json("/api/v1/logs", &token, &first)).await;
    let (status, entry) = send(&ledger.app, post_json("/api/v1/logs", &token, &second)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["id"], 2);
    assert_eq!(entry["previousEntryHash"], GENESIS_HASH);
    assert_eq!(entry["entryHash"], SECOND_HASH);
}

#[tokio::test]
async fn post_logs_rejects_non_object_payload() {
    let ledger = create_test_ledger().await;
    let token = bearer_token("gateway");

    let body = json!({
        "request_data": ["not", "an", "object"],
        "response_data": {},
        "verdict": "ALLOWED"
    });
    let (status, error) = send(&ledger.app, post_json("/api/v1/logs", &token, &body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"]["type"], "encoding_error");

    let (_, list) = send(&ledger.app, get("/api/v1/logs", &token)).await;
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn post_logs_rejects_malformed_json() {
    let ledger = create_test_ledger().await;
    let token = bearer_token("gateway");

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/v1/logs")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"verdict\": "))
        .unwrap();
    let (status, error) = send(&ledger.app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn get_log_returns_entry_and_report() {
    let ledger = create_test_ledger().await;
    let token = bearer_token("auditor");
    let created = append(&ledger.app, &token, "hello", "ALLOWED").await;

    let (status, entry) = send(&ledger.app, get("/api/v1/logs/1", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry, created);

    let (status, report) = send(&ledger.app, get("/api/v1/logs/1/report", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["entryHash"], created["entryHash"]);
}

#[tokio::test]
async fn get_log_unknown_id_is_not_found() {
    let ledger = create_test_ledger().await;
    let token = bearer_token("auditor");

    let (status, error) = send(&ledger.app, get("/api/v1/logs/42", &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"]["type"], "not_found_error");

    let (status, _) = send(&ledger.app, get("/api/v1/logs/42/report", &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_logs_filters_and_paginates_newest_first() {
    let ledger = create_test_ledger().await;
    let token = bearer_token("auditor");
    for i in 0..5 {
        let verdict = if i % 2 == 0 { "ALLOWED" } else { "BLOCKED" };
        append(&ledger.app, &token, &format!("p{}", i), verdict).await;
    }

    let (status, page) = send(&ledger.app, get("/api/v1/logs?perPage=2", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 5);
    assert_eq!(page["perPage"], 2);
    assert_eq!(page["items"][0]["id"], 5);
    assert_eq!(page["items"][1]["id"], 4);

    let (_, page) = send(&ledger.app, get("/api/v1/logs?perPage=2&page=3", &token)).await;
    assert_eq!(page["page"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["items"][0]["id"], 1);

    let (_, blocked) = send(&ledger.app, get("/api/v1/logs?verdict=BLOCKED", &token)).await;
    assert_eq!(blocked["total"], 2);
    assert!(blocked["items"]
        .as_array()
        .unwrap()
        .iter()
        .all(|item| item["verdict"] == "BLOCKED"));
}

#[tokio::test]
async fn health_is_public() {
    let ledger = create_test_ledger().await;
    let request = axum::http::Request::builder()
        .uri("/")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, body) = send(&ledger.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], nova_ledger::api::HEALTH_MESSAGE);
}

#[tokio::test]
async fn list_logs_with_huge_page_returns_empty_page() {
    let ledger = create_test_ledger().await;
    let token = bearer_token("auditor");
    append(&ledger.app, &token, "only", "ALLOWED").await;

    let (status, page) = send(
        &ledger.app,
        get("/api/v1/logs?page=9223372036854775807&perPage=50", &token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert!(page["items"].as_array().unwrap().is_empty());
}
