use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::types::Review,
    error::{AppError, Result},
    handlers::{
        releases::load_release,
        views::{release_view, review_view_for, ReleaseView, ReviewView},
    },
    middleware::{CurrentUser, SanitizedJson},
    services::{ownership::ensure_can_mutate, IntegrityCoordinator},
    state::AppState,
    validation::{parse_id, NumberInput, Validator},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub text: Option<String>,
    pub stars: Option<NumberInput>,
    pub favourite_track: Option<String>,
}

/// Appends a review by the caller. Two concurrent adds on the same release
/// read the same list, so the later write can drop the earlier review.
pub async fn create_review(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(release_id): Path<String>,
    SanitizedJson(payload): SanitizedJson<ReviewRequest>,
) -> Result<(StatusCode, Json<ReviewView>)> {
    let release = load_release(&state, &release_id).await?;

    let mut v = Validator::new();
    let text = v.required_text("text", payload.text, "Review text is required");
    let favourite_track = v.required_text(
        "favouriteTrack",
        payload.favourite_track,
        "Favourite track is required",
    );
    let stars = match payload.stars {
        Some(stars) => v
            .whole_number("stars", &stars, "Stars")
            .and_then(|stars| v.stars("stars", stars)),
        None => {
            v.add("stars", "Stars are required");
            None
        }
    };
    v.finish()?;

    let (Some(text), Some(favourite_track), Some(stars)) = (text, favourite_track, stars) else {
        return Err(AppError::Internal("Validated review is incomplete".to_string()));
    };

    let now = Utc::now();
    let review = Review {
        id: Uuid::new_v4(),
        text,
        stars,
        favourite_track,
        user_id: caller.id,
        created_at: now,
        updated_at: now,
    };

    IntegrityCoordinator::new(state.db.clone())
        .add_review(release, review.clone())
        .await?;
    tracing::info!(review = %review.id, user = %caller.id, "Review added");

    Ok((StatusCode::CREATED, Json(review_view_for(&state.db, &review).await?)))
}

pub async fn update_review(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path((release_id, review_id)): Path<(String, String)>,
    SanitizedJson(payload): SanitizedJson<ReviewRequest>,
) -> Result<Json<ReleaseView>> {
    let review_id = parse_id(&review_id)?;
    let release = load_release(&state, &release_id).await?;
    let review = release
        .reviews
        .get(&review_id)
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;
    ensure_can_mutate(review, caller.id, "update this review")?;

    let mut v = Validator::new();
    let text = v.optional_text("text", payload.text, "Review text cannot be empty");
    let favourite_track = v.optional_text(
        "favouriteTrack",
        payload.favourite_track,
        "Favourite track cannot be empty",
    );
    let stars = payload
        .stars
        .and_then(|stars| v.whole_number("stars", &stars, "Stars"))
        .and_then(|stars| v.stars("stars", stars));
    v.finish()?;

    let updated = IntegrityCoordinator::new(state.db.clone())
        .update_review(release, review_id, |review| {
            if let Some(text) = text {
                review.text = text;
            }
            if let Some(favourite_track) = favourite_track {
                review.favourite_track = favourite_track;
            }
            if let Some(stars) = stars {
                review.stars = stars;
            }
        })
        .await?;
    tracing::info!(review = %review_id, "Review updated");

    Ok(Json(release_view(&state.db, &updated).await?))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path((release_id, review_id)): Path<(String, String)>,
) -> Result<Json<ReleaseView>> {
    let review_id = parse_id(&review_id)?;
    let release = load_release(&state, &release_id).await?;
    let review = release
        .reviews
        .get(&review_id)
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;
    ensure_can_mutate(review, caller.id, "delete this review")?;

    let updated = IntegrityCoordinator::new(state.db.clone())
        .delete_review(release, review_id)
        .await?;
    tracing::info!(review = %review_id, "Review deleted");

    Ok(Json(release_view(&state.db, &updated).await?))
}
