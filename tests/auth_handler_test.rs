//! Integration tests for account lifecycle routes
//!
//! - Signup, email confirmation and login
//! - Forgot / reset password
//! - Mail delivery failures

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use fake::{faker::internet::en::SafeEmail, faker::name::en::FirstName, Fake};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use release_review::db::repositories::UserRepository;
use release_review::handlers;
use release_review::services::verify_password;
use release_review::state::AppState;
use release_review::test_utils::*;

fn create_test_router(state: &AppState) -> Router {
    Router::new()
        .nest("/api", handlers::api_routes(state))
        .with_state(state.clone())
}

async fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: axum::response::Response,
) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn signup_body(email: &str) -> Value {
    json!({
        "username": FirstName().fake::<String>(),
        "email": email,
        "password": TEST_PASSWORD,
        "confirmPassword": TEST_PASSWORD,
    })
}

fn login_body(email: &str, password: &str) -> Value {
    json!({ "email": email, "password": password })
}

#[tokio::test]
async fn test_signup_confirm_login_flow() {
    let (state, mailer) = setup_test_app_state_with_mailer().await;
    let app = create_test_router(&state);
    let email: String = SafeEmail().fake();

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/signup", signup_body(&email)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body["user"]["email"], email.to_lowercase());
    assert!(body["user"].get("passwordHash").is_none());

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, email.to_lowercase());
    let token = mailer.last_token().expect("confirmation link was mailed");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/confirm-email/{}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/login", login_body(&email, TEST_PASSWORD)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = parse_json_response(response).await;
    let session = body["token"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/user")
                .header(header::AUTHORIZATION, format!("Bearer {}", session))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body["email"], email.to_lowercase());
    assert_eq!(body["isEmailConfirmed"], true);
    assert!(body.get("passwordHash").is_none());
    assert!(body.get("emailConfirmationDigest").is_none());
}

#[tokio::test]
async fn test_login_before_confirmation_is_rejected() {
    let state = setup_test_app_state().await;
    create_test_user(&state.db, "pending", "pending@example.com", false).await;
    let app = create_test_router(&state);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/login",
            login_body("pending@example.com", TEST_PASSWORD),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = parse_json_response(response).await;
    assert!(body["details"].as_str().unwrap().contains("confirm your email"));
}

#[tokio::test]
async fn test_login_with_wrong_password_is_rejected() {
    let state = setup_test_app_state().await;
    create_test_user(&state.db, "alice", "alice@example.com", true).await;
    let app = create_test_router(&state);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/login",
            login_body("alice@example.com", "Wr0ng$password"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_confirmation_token_is_single_use() {
    let (state, mailer) = setup_test_app_state_with_mailer().await;
    let app = create_test_router(&state);

    app.clone()
        .oneshot(json_request("POST", "/api/signup", signup_body("once@example.com")))
        .await
        .unwrap();
    let token = mailer.last_token().unwrap();

    let confirm = |token: String| {
        Request::builder()
            .uri(format!("/api/confirm-email/{}", token))
            .body(Body::empty())
            .unwrap()
    };

    let first = app.clone().oneshot(confirm(token.clone())).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(confirm(token)).await.unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let state = setup_test_app_state().await;
    create_test_user(&state.db, "taken", "taken@example.com", true).await;
    let app = create_test_router(&state);

    let response = app
        .oneshot(json_request("POST", "/api/signup", signup_body("Taken@Example.com")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_validation_reports_every_field() {
    let state = setup_test_app_state().await;
    let app = create_test_router(&state);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/signup",
            json!({
                "username": "",
                "email": "not-an-email",
                "password": "weak",
                "confirmPassword": "different",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = parse_json_response(response).await;
    let errors = body["errors"].as_object().unwrap();
    assert!(errors.contains_key("username"));
    assert!(errors.contains_key("email"));
    assert!(errors.contains_key("password"));
    assert!(errors.contains_key("confirmPassword"));
}

#[tokio::test]
async fn test_signup_mail_failure_clears_token() {
    let (state, mailer) = setup_test_app_state_with_mailer().await;
    mailer.set_failing(true);
    let app = create_test_router(&state);

    let response = app
        .oneshot(json_request("POST", "/api/signup", signup_body("nomail@example.com")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let user = UserRepository::new(state.db.clone())
        .find_by_email("nomail@example.com")
        .await
        .unwrap()
        .expect("user row is kept");
    assert!(user.email_confirmation_digest.is_none());
    assert!(user.email_confirmation_expires_at.is_none());
}

#[tokio::test]
async fn test_resend_confirmation_replaces_previous_token() {
    let (state, mailer) = setup_test_app_state_with_mailer().await;
    let app = create_test_router(&state);

    app.clone()
        .oneshot(json_request("POST", "/api/signup", signup_body("again@example.com")))
        .await
        .unwrap();
    let first = mailer.last_token().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/resend-confirmation",
            json!({ "email": "again@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let second = mailer.last_token().unwrap();
    assert_ne!(first, second);

    let stale = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/confirm-email/{}", first))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(stale.status(), StatusCode::BAD_REQUEST);

    let fresh = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/confirm-email/{}", second))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(fresh.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forgot_and_reset_password_flow() {
    let (state, mailer) = setup_test_app_state_with_mailer().await;
    let user = create_test_user(&state.db, "forgetful", "forgetful@example.com", true).await;
    let app = create_test_router(&state);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/forgot-password",
            json!({ "email": "forgetful@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token = mailer.last_token().unwrap();

    let weak = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/reset-password/{}", token),
            json!({ "password": "weak" }),
        ))
        .await
        .unwrap();
    assert_eq!(weak.status(), StatusCode::BAD_REQUEST);

    let new_password = "N3w&Improved";
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/reset-password/{}", token),
            json!({ "password": new_password }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = UserRepository::new(state.db.clone())
        .find_by_id(user.id)
        .await
        .unwrap()
        .unwrap();
    assert!(verify_password(new_password, &stored.password_hash));
    assert!(stored.password_reset_digest.is_none());

    let reused = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/reset-password/{}", token),
            json!({ "password": "An0ther&One" }),
        ))
        .await
        .unwrap();
    assert_eq!(reused.status(), StatusCode::BAD_REQUEST);

    let login = app
        .oneshot(json_request(
            "POST",
            "/api/login",
            login_body("forgetful@example.com", new_password),
        ))
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forgot_password_for_unknown_email_is_not_found() {
    let state = setup_test_app_state().await;
    let app = create_test_router(&state);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/forgot-password",
            json!({ "email": "ghost@example.com" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_operator_keys_are_stripped_from_login() {
    let state = setup_test_app_state().await;
    create_test_user(&state.db, "alice", "alice@example.com", true).await;
    let app = create_test_router(&state);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/login",
            json!({ "email": { "$ne": null }, "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();

    // `{"$ne": null}` becomes `{}`, which is not a string.
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
