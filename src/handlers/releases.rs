use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::{
        entities::release,
        enums::ReleaseType,
        repositories::{ArtistRepository, ReleaseRepository},
        types::{Reviews, TrackList},
    },
    error::{AppError, Result},
    handlers::{
        views::{release_view, release_views, ReleaseView},
        MessageResponse,
    },
    middleware::{CurrentUser, SanitizedJson},
    services::{ownership::ensure_can_mutate, IntegrityCoordinator},
    state::AppState,
    validation::{parse_id, NumberInput, TrackListInput, Validator},
};

/// Create and update share one body shape; on update every field is optional
/// and anything else in the body (owner, reviews, ids) is ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRequest {
    pub title: Option<String>,
    pub image: Option<String>,
    /// Artist id. An empty string clears the artist on update.
    pub artist: Option<String>,
    pub year: Option<NumberInput>,
    pub genre: Option<String>,
    pub track_list: Option<TrackListInput>,
    pub release_type: Option<String>,
}

pub(crate) async fn load_release(state: &AppState, raw_id: &str) -> Result<release::Model> {
    let id = parse_id(raw_id)?;
    ReleaseRepository::new(state.db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Release not found".to_string()))
}

/// `Some(None)` clears the artist, `None` leaves it untouched. An id that is
/// malformed or names no artist is a field error.
async fn resolve_artist(
    state: &AppState,
    v: &mut Validator,
    raw: Option<String>,
) -> Result<Option<Option<Uuid>>> {
    let Some(raw) = raw.map(|r| r.trim().to_string()) else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(Some(None));
    }
    let Ok(id) = Uuid::parse_str(&raw) else {
        v.add("artist", "Artist not found");
        return Ok(None);
    };
    if ArtistRepository::new(state.db.clone()).find_by_id(id).await?.is_none() {
        v.add("artist", "Artist not found");
        return Ok(None);
    }
    Ok(Some(Some(id)))
}

fn track_list(v: &mut Validator, input: Option<TrackListInput>, required: bool) -> Option<Vec<String>> {
    match input.map(TrackListInput::into_tracks) {
        Some(tracks) if !tracks.is_empty() => Some(tracks),
        Some(_) => {
            v.add("trackList", "Track list must contain at least one track");
            None
        }
        None => {
            if required {
                v.add("trackList", "Track list is required");
            }
            None
        }
    }
}

fn release_type(v: &mut Validator, raw: Option<String>, required: bool) -> Option<ReleaseType> {
    match raw {
        Some(raw) => match raw.trim().parse::<ReleaseType>() {
            Ok(release_type) => Some(release_type),
            Err(msg) => {
                v.add("releaseType", msg);
                None
            }
        },
        None => {
            if required {
                v.add("releaseType", "Release type is required");
            }
            None
        }
    }
}

pub async fn list_releases(State(state): State<AppState>) -> Result<Json<Vec<ReleaseView>>> {
    let releases = ReleaseRepository::new(state.db.clone()).find_all().await?;
    Ok(Json(release_views(&state.db, &releases).await?))
}

pub async fn get_release(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReleaseView>> {
    let release = load_release(&state, &id).await?;
    Ok(Json(release_view(&state.db, &release).await?))
}

pub async fn create_release(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    SanitizedJson(payload): SanitizedJson<ReleaseRequest>,
) -> Result<(StatusCode, Json<ReleaseView>)> {
    let mut v = Validator::new();
    let title = v.required_text("title", payload.title, "Title is required");
    let image = v.required_text("image", payload.image, "Image is required");
    let genre = v.required_text("genre", payload.genre, "Genre is required");
    let year = match payload.year {
        Some(year) => v
            .whole_number("year", &year, "Year")
            .and_then(|year| v.release_year("year", year)),
        None => {
            v.add("year", "Year is required");
            None
        }
    };
    let tracks = track_list(&mut v, payload.track_list, true);
    let release_type = release_type(&mut v, payload.release_type, true);
    let artist_id = resolve_artist(&state, &mut v, payload.artist).await?.flatten();
    v.finish()?;

    let (Some(title), Some(image), Some(genre), Some(year), Some(tracks), Some(release_type)) =
        (title, image, genre, year, tracks, release_type)
    else {
        return Err(AppError::Internal("Validated release is incomplete".to_string()));
    };

    let now = Utc::now().into();
    let new_release = release::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        image: Set(image),
        artist_id: Set(artist_id),
        year: Set(year),
        genre: Set(genre),
        track_list: Set(TrackList(tracks)),
        release_type: Set(release_type),
        reviews: Set(Reviews::default()),
        user_id: Set(caller.id),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let saved = IntegrityCoordinator::new(state.db.clone())
        .create_release(new_release)
        .await?;

    Ok((StatusCode::CREATED, Json(release_view(&state.db, &saved).await?)))
}

pub async fn update_release(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<String>,
    SanitizedJson(payload): SanitizedJson<ReleaseRequest>,
) -> Result<Json<ReleaseView>> {
    let existing = load_release(&state, &id).await?;
    ensure_can_mutate(&existing, caller.id, "update this release")?;

    let mut v = Validator::new();
    let title = v.optional_text("title", payload.title, "Title cannot be empty");
    let image = v.optional_text("image", payload.image, "Image cannot be empty");
    let genre = v.optional_text("genre", payload.genre, "Genre cannot be empty");
    let year = payload
        .year
        .and_then(|year| v.whole_number("year", &year, "Year"))
        .and_then(|year| v.release_year("year", year));
    let tracks = track_list(&mut v, payload.track_list, false);
    let release_type = release_type(&mut v, payload.release_type, false);
    let artist_id = resolve_artist(&state, &mut v, payload.artist).await?;
    v.finish()?;

    let mut changes: release::ActiveModel = existing.clone().into();
    if let Some(title) = title {
        changes.title = Set(title);
    }
    if let Some(image) = image {
        changes.image = Set(image);
    }
    if let Some(genre) = genre {
        changes.genre = Set(genre);
    }
    if let Some(year) = year {
        changes.year = Set(year);
    }
    if let Some(tracks) = tracks {
        changes.track_list = Set(TrackList(tracks));
    }
    if let Some(release_type) = release_type {
        changes.release_type = Set(release_type);
    }
    if let Some(artist_id) = artist_id {
        changes.artist_id = Set(artist_id);
    }
    changes.updated_at = Set(Utc::now().into());

    let updated = IntegrityCoordinator::new(state.db.clone())
        .update_release(&existing, changes)
        .await?;
    tracing::info!(release = %updated.id, "Release updated");

    Ok(Json(release_view(&state.db, &updated).await?))
}

pub async fn delete_release(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let existing = load_release(&state, &id).await?;
    ensure_can_mutate(&existing, caller.id, "delete this release")?;

    IntegrityCoordinator::new(state.db.clone())
        .delete_release(&existing)
        .await?;

    Ok(MessageResponse::new("Release deleted successfully"))
}
