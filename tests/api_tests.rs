//! API integration tests against an in-memory store

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

use library_lending::{
    api,
    clock::ManualClock,
    config::AppConfig,
    repository::MemoryStore,
    AppState, LendingEngine,
};

fn app() -> (Router, Arc<ManualClock>) {
    let config = AppConfig::default();
    let clock = Arc::new(ManualClock::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
    let engine = LendingEngine::new(
        Arc::new(MemoryStore::new(Duration::from_secs(5))),
        clock.clone(),
        config.lending.clone(),
    );
    let state = AppState {
        config: Arc::new(config),
        engine: Arc::new(engine),
    };
    (api::create_router(state), clock)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(format!("/api/v1{}", uri));
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to send request");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Failed to parse response")
    };
    (status, body)
}

async fn create_book(app: &Router, isbn: &str, copies: i32) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/books",
        Some(json!({
            "title": "The Left Hand of Darkness",
            "author": "Ursula K. Le Guin",
            "isbn": isbn,
            "total_copies": copies
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

async fn create_member(app: &Router, email: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/members",
        Some(json!({ "name": "Alice Johnson", "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = app();

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_create_book() {
    let (app, _) = app();
    let id = create_book(&app, "978-0441478125", 2).await;

    let (status, body) = send(&app, Method::GET, &format!("/books/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_copies"], 2);
    assert_eq!(body["available_copies"], 2);
}

#[tokio::test]
async fn test_invalid_book_is_bad_request() {
    let (app, _) = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/books",
        Some(json!({ "title": "", "author": "A", "isbn": "1", "total_copies": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
    assert_eq!(body["kind"], "validation");

    create_book(&app, "isbn-dup", 1).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/books",
        Some(json!({ "title": "T", "author": "A", "isbn": "isbn-dup" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "DuplicateIsbn");
}

#[tokio::test]
async fn test_unknown_book_is_not_found() {
    let (app, _) = app();

    let (status, body) = send(&app, Method::GET, "/books/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchBook");
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_borrow_and_return() {
    let (app, clock) = app();
    let book_id = create_book(&app, "isbn-1", 1).await;
    let member_id = create_member(&app, "alice@example.com").await;
    let request = json!({ "book_id": book_id, "member_id": member_id });

    let (status, loan) = send(&app, Method::POST, "/loans/borrow", Some(request.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["borrowed_date"], "2024-03-01");
    assert_eq!(loan["due_date"], "2024-03-15");
    assert!(loan["returned_date"].is_null());

    let (status, body) = send(&app, Method::POST, "/loans/borrow", Some(request.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DuplicateActiveLoan");

    let (status, body) = send(&app, Method::GET, &format!("/loans/{}", member_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::DELETE, &format!("/books/{}", book_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "HasActiveReferences");

    clock.advance_days(20);
    let (status, loan) = send(&app, Method::POST, "/loans/return", Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loan["returned_date"], "2024-03-21");
    assert_eq!(loan["fine_amount"], "3.00");

    let (status, body) = send(&app, Method::POST, "/loans/return", Some(request)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchLoan");

    let (status, fines) = send(&app, Method::GET, &format!("/loans/{}/fines", member_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fines["total"], "3.00");

    let (status, settled) = send(
        &app,
        Method::POST,
        &format!("/loans/{}/fines/settle", member_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settled.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_no_copies_left_is_conflict() {
    let (app, _) = app();
    let book_id = create_book(&app, "isbn-1", 1).await;
    let first = create_member(&app, "first@example.com").await;
    let second = create_member(&app, "second@example.com").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/loans/borrow",
        Some(json!({ "book_id": book_id, "member_id": first })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/loans/borrow",
        Some(json!({ "book_id": book_id, "member_id": second })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "InventoryExhausted");
}

#[tokio::test]
async fn test_member_lifecycle() {
    let (app, _) = app();
    let member_id = create_member(&app, "bob@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/members",
        Some(json!({ "name": "Bob", "email": "not-an-email" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, body) = send(&app, Method::GET, &format!("/members/{}", member_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "bob@example.com");
    assert_eq!(body["active_loans_count"], 0);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/members/{}", member_id),
        Some(json!({ "is_active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    let (status, body) = send(&app, Method::GET, "/members?is_active=false", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::DELETE, &format!("/members/{}", member_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &format!("/members/{}", member_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tools_list_and_call() {
    let (app, _) = app();

    let (status, tools) = send(&app, Method::GET, "/tools", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|tool| tool["name"].as_str())
        .collect();
    assert!(names.contains(&"borrow_book"));
    assert!(names.contains(&"check_fines"));

    let book_id = create_book(&app, "isbn-1", 2).await;
    let member_id = create_member(&app, "carol@example.com").await;

    let (status, output) = send(
        &app,
        Method::POST,
        "/tools/call",
        Some(json!({
            "name": "borrow_book",
            "arguments": { "book_id": book_id, "member_id": member_id }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(output["tool"], "borrow_book");
    assert_eq!(output["result"]["book_id"], book_id);

    let (_, book) = send(&app, Method::GET, &format!("/books/{}", book_id), None).await;
    assert_eq!(book["available_copies"], 1);

    let (status, body) = send(
        &app,
        Method::POST,
        "/tools/call",
        Some(json!({ "name": "renew_loan", "arguments": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "UnknownTool");

    let (status, body) = send(
        &app,
        Method::POST,
        "/tools/call",
        Some(json!({ "name": "return_book", "arguments": { "book_id": book_id, "member_id": 999 } })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchLoan");
}
