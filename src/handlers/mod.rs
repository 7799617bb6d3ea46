pub mod artists;
pub mod auth;
pub mod health;
pub mod releases;
pub mod reviews;
pub mod users;
pub mod views;

use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::{middleware::require_auth, state::AppState};

/// Plain `{"message": ...}` body for actions with nothing else to return.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub(crate) fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// Routes mounted under `/api`. Public and authenticated routes share paths
/// (e.g. `GET /releases` vs `POST /releases`), so they are built as two
/// routers and merged; only the second carries the auth layer.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        // Account lifecycle
        .route("/signup", post(auth::signup))
        .route("/confirm-email/:token", get(auth::confirm_email))
        .route("/resend-confirmation", post(auth::resend_confirmation))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password/:token", put(auth::reset_password))

        // Catalogue reads
        .route("/releases", get(releases::list_releases))
        .route("/releases/:id", get(releases::get_release))
        .route("/artists", get(artists::list_artists))
        .route("/artists/:id", get(artists::get_artist));

    let protected = Router::new()
        // Users
        .route("/user", get(users::get_current_user))
        .route("/user/:user_id/profile", get(users::get_profile))
        .route("/user/:user_id/uploads", get(users::get_uploads))
        .route("/user/:user_id/favourites", get(users::get_favourites))
        .route(
            "/user/:user_id/favourites/:release_id",
            post(users::add_favourite).delete(users::remove_favourite),
        )

        // Releases
        .route("/releases", post(releases::create_release))
        .route(
            "/releases/:id",
            put(releases::update_release).delete(releases::delete_release),
        )

        // Reviews
        .route("/releases/:id/reviews", post(reviews::create_review))
        .route(
            "/releases/:id/reviews/:review_id",
            put(reviews::update_review).delete(reviews::delete_review),
        )

        // Artists
        .route("/artists", post(artists::create_artist))
        .route(
            "/artists/:id",
            put(artists::update_artist).delete(artists::delete_artist),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    public.merge(protected)
}
