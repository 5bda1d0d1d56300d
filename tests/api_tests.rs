//! API integration tests against a running server
//!
//! Start the server with the default configuration (default admin and sample
//! books seeded), then run: cargo test -- --ignored

use athenaeum_server::config::AppConfig;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::PgPool;

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Direct database access, for setting up states the API cannot reach (past due dates)
async fn connect_db() -> PgPool {
    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| AppConfig::default().database.url);
    PgPool::connect(&url).await.expect("Failed to connect to database")
}

async fn user_total(client: &Client, admin: &str) -> i64 {
    let body: Value = client
        .get(format!("{}/users", BASE_URL))
        .bearer_auth(admin)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    body["data"]["total"].as_i64().expect("No total")
}

async fn issue(client: &Client, token: &str, book_id: i64) -> i64 {
    let response = client
        .post(format!("{}/transactions/issue", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["data"]["id"].as_i64().expect("No transaction id")
}

async fn overdue_ids(client: &Client, admin: &str) -> Vec<i64> {
    let body: Value = client
        .get(format!("{}/transactions/overdue", BASE_URL))
        .bearer_auth(admin)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    body["data"]
        .as_array()
        .expect("No overdue list")
        .iter()
        .filter_map(|t| t["id"].as_i64())
        .collect()
}

/// Log in as the default administrator
async fn get_admin_token(client: &Client) -> String {
    login(client, "admin", "admin123").await
}

async fn login(client: &Client, username: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["data"]["token"].as_str().expect("No token in response").to_string()
}

/// Register a fresh member and return (id, token)
async fn register_member(client: &Client) -> (i64, String) {
    let suffix = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    register_member_named(client, &format!("member{}", suffix)).await
}

/// Register `username` with email `<username>@example.org` and return (id, token)
async fn register_member_named(client: &Client, username: &str) -> (i64, String) {

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.org", username),
            "password": "secret1",
            "full_name": "Test Member"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    let id = body["data"]["id"].as_i64().expect("No user id");
    let token = login(client, username, "secret1").await;
    (id, token)
}

/// Create a book with a unique barcode and return its id
async fn create_book(client: &Client, admin: &str, copies: i32) -> i64 {
    let suffix = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(admin)
        .json(&json!({
            "barcode": format!("TEST-{}", suffix),
            "title": "Integration Testing",
            "author": "Test Author",
            "total_copies": copies
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["data"]["id"].as_i64().expect("No book id")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "username": "admin", "password": "admin123" }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"]["token"].is_string());
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "username": "admin", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[ignore]
async fn test_init_is_idempotent() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/init", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Default user already exists");
}

#[tokio::test]
#[ignore]
async fn test_duplicate_registration_rejected() {
    let client = Client::new();
    let admin = get_admin_token(&client).await;

    let before: Value = client
        .get(format!("{}/users", BASE_URL))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": "admin",
            "email": "someone-else@example.org",
            "password": "secret1",
            "full_name": "Impostor"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let after: Value = client
        .get(format!("{}/users", BASE_URL))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(before["data"]["total"], after["data"]["total"]);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_email_rejected() {
    let client = Client::new();
    let admin = get_admin_token(&client).await;
    let suffix = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let first = format!("first{}", suffix);
    register_member_named(&client, &first).await;

    let before = user_total(&client, &admin).await;

    for email in [format!("{}@example.org", first), format!("{}@EXAMPLE.org", first.to_uppercase())] {
        let response = client
            .post(format!("{}/auth/register", BASE_URL))
            .json(&json!({
                "username": format!("second{}", suffix),
                "email": email,
                "password": "secret1",
                "full_name": "Second Member"
            }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", email);
        let body: Value = response.json().await.expect("Failed to parse response");
        assert_eq!(body["success"], false);
    }

    assert_eq!(user_total(&client, &admin).await, before);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_init_is_idempotent() {
    let client = Client::new();
    let init = || client.post(format!("{}/auth/init", BASE_URL)).send();

    let (a, b) = tokio::join!(init(), init());
    for response in [a, b] {
        let response = response.expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.expect("Failed to parse response");
        assert_eq!(body["success"], true);
    }
}

#[tokio::test]
#[ignore]
async fn test_list_books() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let response = client
        .get(format!("{}/books?per_page=5", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"]["items"].is_array());
    assert!(body["data"]["total"].is_number());
    assert_eq!(body["data"]["per_page"], 5);
}

#[tokio::test]
#[ignore]
async fn test_issue_and_return_restores_copies() {
    let client = Client::new();
    let admin = get_admin_token(&client).await;
    let (_, member) = register_member(&client).await;
    let book_id = create_book(&client, &admin, 1).await;

    // Issue the only copy
    let response = client
        .post(format!("{}/transactions/issue", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let issued: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(issued["data"]["transaction_type"], "ISSUE");
    assert_eq!(issued["data"]["status"], "ACTIVE");
    let transaction_id = issued["data"]["id"].as_i64().expect("No transaction id");

    // No copies left
    let response = client
        .post(format!("{}/transactions/issue", BASE_URL))
        .bearer_auth(&admin)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Return it
    let response = client
        .post(format!("{}/transactions/{}/return", BASE_URL, transaction_id))
        .bearer_auth(&member)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let returned: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(returned["data"]["status"], "CLOSED");
    assert!(returned["data"]["return_date"].is_string());

    // Returning twice fails
    let response = client
        .post(format!("{}/transactions/{}/return", BASE_URL, transaction_id))
        .bearer_auth(&member)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(book["data"]["available_copies"], 1);
    assert_eq!(book["data"]["total_copies"], 1);
}

#[tokio::test]
#[ignore]
async fn test_double_issue_rejected() {
    let client = Client::new();
    let admin = get_admin_token(&client).await;
    let (user_id, member) = register_member(&client).await;
    let book_id = create_book(&client, &admin, 3).await;

    let issue = || {
        client
            .post(format!("{}/transactions/issue", BASE_URL))
            .bearer_auth(&member)
            .json(&json!({ "book_id": book_id }))
            .send()
    };

    assert_eq!(issue().await.expect("Failed to send request").status(), StatusCode::CREATED);
    assert_eq!(issue().await.expect("Failed to send request").status(), StatusCode::BAD_REQUEST);

    let loans: Value = client
        .get(format!("{}/users/{}/loans", BASE_URL, user_id))
        .bearer_auth(&member)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(loans["data"].as_array().map(Vec::len), Some(1));

    // Deleting a book with an active loan is refused
    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_overdue_lists_only_active_past_due_loans() {
    let client = Client::new();
    let db = connect_db().await;
    let admin = get_admin_token(&client).await;
    let (_, member) = register_member(&client).await;

    let late_book = create_book(&client, &admin, 1).await;
    let fresh_book = create_book(&client, &admin, 1).await;
    let late = issue(&client, &member, late_book).await;
    let fresh = issue(&client, &member, fresh_book).await;

    sqlx::query(
        "UPDATE transactions SET issue_date = NOW() - INTERVAL '20 days', due_date = NOW() - INTERVAL '1 day' WHERE id = $1",
    )
    .bind(late as i32)
    .execute(&db)
    .await
    .expect("Failed to back-date loan");

    let overdue = overdue_ids(&client, &admin).await;
    assert!(overdue.contains(&late));
    assert!(!overdue.contains(&fresh));

    let details: Value = client
        .get(format!("{}/transactions/{}", BASE_URL, late))
        .bearer_auth(&member)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(details["data"]["is_overdue"], true);

    let response = client
        .post(format!("{}/transactions/{}/return", BASE_URL, late))
        .bearer_auth(&member)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let overdue = overdue_ids(&client, &admin).await;
    assert!(!overdue.contains(&late));
    assert!(!overdue.contains(&fresh));
}

#[tokio::test]
#[ignore]
async fn test_overdue_requires_librarian() {
    let client = Client::new();
    let (_, member) = register_member(&client).await;
    let admin = get_admin_token(&client).await;

    let response = client
        .get(format!("{}/transactions/overdue", BASE_URL))
        .bearer_auth(&member)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .get(format!("{}/transactions/overdue", BASE_URL))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"].is_array());
}
