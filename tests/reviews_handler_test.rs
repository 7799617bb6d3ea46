//! Integration tests for review routes
//!
//! Reviews live inside their release; only the author may edit or delete one,
//! regardless of who owns the release.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

use release_review::db::repositories::ReleaseRepository;
use release_review::handlers;
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

fn authed(method: &str, uri: &str, auth: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, auth);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn review_body(stars: i32) -> Value {
    json!({ "text": "A late-night classic.", "stars": stars, "favouriteTrack": "Intro" })
}

#[tokio::test]
async fn test_create_review() {
    let state = setup_test_app_state().await;
    let owner = create_test_user(&state.db, "owner", "owner@example.com", true).await;
    let critic = create_test_user(&state.db, "critic", "critic@example.com", true).await;
    let release = create_test_release(&state.db, owner.id, None, "Reviewed").await;
    let app = create_test_router(&state);

    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/api/releases/{}/reviews", release.id),
            &bearer(&state, &critic),
            Some(review_body(4)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body["stars"], 4);
    assert_eq!(body["user"]["username"], "critic");

    let detail = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/releases/{}", release.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body: Value = parse_json_response(detail).await;
    assert_eq!(body["reviews"][0]["user"]["username"], "critic");
}

#[tokio::test]
async fn test_review_stars_are_bounded() {
    let state = setup_test_app_state().await;
    let critic = create_test_user(&state.db, "critic", "critic@example.com", true).await;
    let release = create_test_release(&state.db, critic.id, None, "Rated").await;
    let app = create_test_router(&state);

    let response = app
        .oneshot(authed(
            "POST",
            &format!("/api/releases/{}/reviews", release.id),
            &bearer(&state, &critic),
            Some(review_body(6)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = parse_json_response(response).await;
    assert!(body["errors"]["stars"].is_string());
}

#[tokio::test]
async fn test_review_stars_accept_numeric_strings_but_not_fractions() {
    let state = setup_test_app_state().await;
    let critic = create_test_user(&state.db, "critic", "critic@example.com", true).await;
    let release = create_test_release(&state.db, critic.id, None, "Rated").await;
    let uri = format!("/api/releases/{}/reviews", release.id);
    let auth = bearer(&state, &critic);
    let app = create_test_router(&state);

    let half_star = app
        .clone()
        .oneshot(authed(
            "POST",
            &uri,
            &auth,
            Some(json!({ "text": "", "stars": 4.5, "favouriteTrack": "Intro" })),
        ))
        .await
        .unwrap();
    assert_eq!(half_star.status(), StatusCode::BAD_REQUEST);
    let body: Value = parse_json_response(half_star).await;
    assert_eq!(body["errors"]["stars"], "Stars must be a whole number");
    assert!(body["errors"]["text"].is_string());

    let mut quoted = review_body(0);
    quoted["stars"] = json!("5");
    let accepted = app.oneshot(authed("POST", &uri, &auth, Some(quoted))).await.unwrap();
    assert_eq!(accepted.status(), StatusCode::CREATED);
    let body: Value = parse_json_response(accepted).await;
    assert_eq!(body["stars"], 5);
}

#[tokio::test]
async fn test_only_author_can_edit_or_delete_review() {
    let state = setup_test_app_state().await;
    let owner = create_test_user(&state.db, "owner", "owner@example.com", true).await;
    let critic = create_test_user(&state.db, "critic", "critic@example.com", true).await;
    let release = create_test_release(&state.db, owner.id, None, "Contested").await;
    let app = create_test_router(&state);

    let created = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/api/releases/{}/reviews", release.id),
            &bearer(&state, &critic),
            Some(review_body(2)),
        ))
        .await
        .unwrap();
    let review: Value = parse_json_response(created).await;
    let uri = format!(
        "/api/releases/{}/reviews/{}",
        release.id,
        review["id"].as_str().unwrap()
    );

    // The release owner is not the review's author.
    let forbidden = app
        .clone()
        .oneshot(authed("PUT", &uri, &bearer(&state, &owner), Some(json!({ "stars": 5 }))))
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let forbidden = app
        .clone()
        .oneshot(authed("DELETE", &uri, &bearer(&state, &owner), None))
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let updated = app
        .clone()
        .oneshot(authed("PUT", &uri, &bearer(&state, &critic), Some(json!({ "stars": 3 }))))
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    let body: Value = parse_json_response(updated).await;
    assert_eq!(body["reviews"][0]["stars"], 3);
    assert_eq!(body["reviews"][0]["text"], "A late-night classic.");

    let deleted = app
        .oneshot(authed("DELETE", &uri, &bearer(&state, &critic), None))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);
    let body: Value = parse_json_response(deleted).await;
    assert_eq!(body["reviews"], json!([]));
}

#[tokio::test]
async fn test_missing_review_is_not_found() {
    let state = setup_test_app_state().await;
    let critic = create_test_user(&state.db, "critic", "critic@example.com", true).await;
    let release = create_test_release(&state.db, critic.id, None, "Quiet").await;
    let app = create_test_router(&state);

    let response = app
        .oneshot(authed(
            "PUT",
            &format!("/api/releases/{}/reviews/{}", release.id, Uuid::new_v4()),
            &bearer(&state, &critic),
            Some(json!({ "stars": 1 })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Concurrent adds are read-modify-write on the release's review list. Both
/// requests succeed; the later write may overwrite the earlier one, so either
/// one or both reviews survive.
#[tokio::test]
async fn test_concurrent_reviews_may_lose_an_update() {
    let state = setup_test_app_state().await;
    let owner = create_test_user(&state.db, "owner", "owner@example.com", true).await;
    let a = create_test_user(&state.db, "a", "a@example.com", true).await;
    let b = create_test_user(&state.db, "b", "b@example.com", true).await;
    let release = create_test_release(&state.db, owner.id, None, "Busy").await;
    let app = create_test_router(&state);
    let uri = format!("/api/releases/{}/reviews", release.id);

    let (first, second) = tokio::join!(
        app.clone()
            .oneshot(authed("POST", &uri, &bearer(&state, &a), Some(review_body(5)))),
        app.clone()
            .oneshot(authed("POST", &uri, &bearer(&state, &b), Some(review_body(1)))),
    );
    assert_eq!(first.unwrap().status(), StatusCode::CREATED);
    assert_eq!(second.unwrap().status(), StatusCode::CREATED);

    let stored = ReleaseRepository::new(state.db.clone())
        .find_by_id(release.id)
        .await
        .unwrap()
        .unwrap();
    let count = stored.reviews.iter().count();
    assert!((1..=2).contains(&count), "unexpected review count {}", count);
}
