mod common;

use axum::http::StatusCode;
use serde_json::json;
use std::time::Duration;

use common::{get_authed, json, TestApp};

fn registration(email: &str) -> serde_json::Value {
    json!({ "name": "Alice Smith", "email": email, "password": "pa55word" })
}

/// Register and return the activation token from the welcome email.
async fn register(app: &TestApp, email: &str) -> String {
    let res = app.request(json("POST", "/v1/users", None, registration(email))).await;
    assert_eq!(res.status, StatusCode::ACCEPTED, "{}", res.body);

    tokio::time::timeout(Duration::from_secs(5), app.state.background.wait_idle())
        .await
        .expect("welcome email sent");

    let sent = app.mailer.sent();
    let message = sent.iter().rev().find(|m| m.to == email).expect("welcome email recorded");
    let start = message.body.find("{\"token\": \"").expect("token in body") + "{\"token\": \"".len();
    message.body[start..start + 26].to_string()
}

#[tokio::test]
async fn registration_returns_the_user_without_secrets() {
    let app = TestApp::new();
    let res = app.request(json("POST", "/v1/users", None, registration("alice@example.com"))).await;

    assert_eq!(res.status, StatusCode::ACCEPTED);
    assert_eq!(res.body["user"]["email"], "alice@example.com");
    assert_eq!(res.body["user"]["activated"], false);
    assert!(res.body["user"].get("password_hash").is_none());
    assert!(res.body["user"].get("version").is_none());
}

#[tokio::test]
async fn registration_validates_input() {
    let app = TestApp::new();
    let body = json!({ "name": "", "email": "nope", "password": "short" });
    let res = app.request(json("POST", "/v1/users", None, body)).await;

    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["error"]["name"], "must be provided");
    assert_eq!(res.body["error"]["email"], "must be a valid email address");
    assert_eq!(res.body["error"]["password"], "must be at least 8 bytes long");
}

#[tokio::test]
async fn duplicate_email_is_a_validation_error() {
    let app = TestApp::new();
    register(&app, "dup@example.com").await;

    let res = app.request(json("POST", "/v1/users", None, registration("dup@example.com"))).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["error"]["email"], "a user with this email address already exists");
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let app = TestApp::new();

    let res = app.request(json("POST", "/v1/users", None, json!({ "name": "x", "admin": true }))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["error"].is_string());

    let request = axum::http::Request::post("/v1/users")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"name\": "))
        .unwrap();
    let res = app.request(request).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "body contains badly-formed JSON");
}

#[tokio::test]
async fn activation_consumes_the_token() {
    let app = TestApp::new();
    let token = register(&app, "bob@example.com").await;

    let res = app.request(json("PUT", "/v1/users/activated", None, json!({ "token": token }))).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["user"]["activated"], true);

    let res = app.request(json("PUT", "/v1/users/activated", None, json!({ "token": token }))).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["error"]["token"], "invalid or expired activation token");
}

#[tokio::test]
async fn activation_token_shape_is_validated() {
    let app = TestApp::new();
    let res = app.request(json("PUT", "/v1/users/activated", None, json!({ "token": "abc" }))).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["error"]["token"], "must be 26 bytes long");
}

#[tokio::test]
async fn login_issues_a_token_and_revokes_the_previous_one() {
    let app = TestApp::new();
    let token = register(&app, "carol@example.com").await;
    app.request(json("PUT", "/v1/users/activated", None, json!({ "token": token }))).await;

    let credentials = json!({ "email": "carol@example.com", "password": "pa55word" });
    let first = app
        .request(json("POST", "/v1/tokens/authentication", None, credentials.clone()))
        .await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.body);
    let first_token = first.body["authentication_token"]["token"].as_str().unwrap().to_string();
    assert_eq!(first_token.len(), 26);
    assert!(first.body["authentication_token"]["expiry"].is_string());

    // new accounts can read movies
    let res = app.request(get_authed("/v1/movies", &first_token)).await;
    assert_eq!(res.status, StatusCode::OK);

    let second = app.request(json("POST", "/v1/tokens/authentication", None, credentials)).await;
    let second_token = second.body["authentication_token"]["token"].as_str().unwrap().to_string();

    let res = app.request(get_authed("/v1/movies", &first_token)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    let res = app.request(get_authed("/v1/movies", &second_token)).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn bad_credentials_are_rejected_uniformly() {
    let app = TestApp::new();
    register(&app, "dave@example.com").await;

    let wrong_password = json!({ "email": "dave@example.com", "password": "not-the-password" });
    let unknown_email = json!({ "email": "nobody@example.com", "password": "pa55word" });

    for body in [wrong_password, unknown_email] {
        let res = app.request(json("POST", "/v1/tokens/authentication", None, body)).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["error"], "invalid authentication credentials");
    }
}
