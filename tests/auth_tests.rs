mod common;

use axum::http::StatusCode;
use common::{RESET_BASE_URL, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::spawn().await;

    let response = app.register("Ana", "Ana@Example.com", "secret123").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["email"], "ana@example.com");
    assert_eq!(response.data()["profile"], "Usuario");
    assert_eq!(response.data()["points"], 0);

    let response = app.login("ana@example.com", "secret123").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["name"], "Ana");
    let cookie = response.cookie.expect("session cookie");

    let me = app.get("/api/auth/me", &cookie).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.data()["email"], "ana@example.com");
    assert_eq!(me.data()["is_blocked"], false);
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = TestApp::spawn().await;

    let response = app.request("GET", "/api/auth/me", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["success"], false);

    let response = app.request("GET", "/api/occurrences/mine", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_routes() {
    let app = TestApp::spawn().await;

    let health = app.request("GET", "/api/system/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.data()["status"], "ok");

    let statuses = app.request("GET", "/api/statuses", None, None).await;
    assert_eq!(statuses.status, StatusCode::OK);
    let names: Vec<&str> = statuses
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 5);
    assert!(names.contains(&"Registrada"));
    assert!(names.contains(&"Fechada com solução"));
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::spawn().await;

    let response = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Ana",
                "email": "ana@example.com",
                "password": "secret123",
                "confirm_password": "different",
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.register("Ana", "ana@example.com", "123").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.register("  ", "ana@example.com", "secret123").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.register("Ana", "not-an-email", "secret123").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = TestApp::spawn().await;

    assert_eq!(
        app.register("Ana", "ana@example.com", "secret123").await.status,
        StatusCode::OK
    );
    let response = app.register("Outra Ana", "ANA@example.com", "secret123").await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_credentials() {
    let app = TestApp::spawn().await;
    app.register("Ana", "ana@example.com", "secret123").await;

    let response = app.login("ana@example.com", "wrong-password").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.cookie.is_none());

    let response = app.login("nobody@example.com", "secret123").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::spawn().await;
    let (_, cookie) = app.citizen("Ana", "ana@example.com").await;

    let response = app
        .request("POST", "/api/auth/logout", Some(&cookie), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let me = app.get("/api/auth/me", &cookie).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::spawn().await;
    app.register("Ana", "ana@example.com", "secret123").await;

    let response = app
        .request(
            "POST",
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": "ana@example.com" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "ana@example.com");

    let body = &sent[0].1.body;
    let start = body.find(RESET_BASE_URL).expect("reset link in mail") + RESET_BASE_URL.len() + 1;
    let token: String = body[start..]
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect();
    assert_eq!(token.len(), 64);

    let reset_uri = format!("/api/auth/reset-password/{token}");
    let payload = json!({
        "new_password": "nova-senha",
        "confirm_new_password": "nova-senha",
    });

    let response = app
        .request("POST", &reset_uri, None, Some(payload.clone()))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    // Tokens are single use.
    let response = app.request("POST", &reset_uri, None, Some(payload)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    assert_eq!(
        app.login("ana@example.com", "secret123").await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.login("ana@example.com", "nova-senha").await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_forgot_password_unknown_email_is_silent() {
    let app = TestApp::spawn().await;

    let response = app
        .request(
            "POST",
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": "ghost@example.com" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(app.mailer.sent().is_empty());

    let response = app
        .request(
            "POST",
            "/api/auth/reset-password/not-a-token",
            None,
            Some(json!({
                "new_password": "secret123",
                "confirm_new_password": "secret123",
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
