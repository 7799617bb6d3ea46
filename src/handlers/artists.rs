use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{Datelike, Utc};
use sea_orm::Set;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::{
        entities::artist,
        repositories::ArtistRepository,
        types::IdList,
    },
    error::{AppError, Result},
    handlers::{
        views::{artist_view, artist_views, ArtistView},
        MessageResponse,
    },
    middleware::{CurrentUser, SanitizedJson},
    services::{ownership::ensure_can_mutate, IntegrityCoordinator},
    state::AppState,
    validation::{parse_id, IdListInput, NumberInput, Validator},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistRequest {
    pub name: Option<String>,
    pub genre: Option<String>,
    pub image: Option<String>,
    pub country: Option<String>,
    pub formed_year: Option<NumberInput>,
    pub biography: Option<String>,
    /// Only read on create. The list is maintained through release changes
    /// afterwards.
    pub releases: Option<IdListInput>,
}

async fn load_artist(state: &AppState, raw_id: &str) -> Result<artist::Model> {
    let id = parse_id(raw_id)?;
    ArtistRepository::new(state.db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Artist not found".to_string()))
}

fn formed_year(v: &mut Validator, input: &NumberInput) -> Option<i32> {
    let year = v.whole_number("formedYear", input, "Formed year")?;
    let current = Utc::now().year();
    if year > current {
        v.add("formedYear", format!("Formed year must be at most {}", current));
        None
    } else if year < 1 {
        v.add("formedYear", "Formed year must be positive");
        None
    } else {
        Some(year)
    }
}

pub async fn list_artists(State(state): State<AppState>) -> Result<Json<Vec<ArtistView>>> {
    let artists = ArtistRepository::new(state.db.clone()).find_all().await?;
    Ok(Json(artist_views(&state.db, &artists).await?))
}

pub async fn get_artist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ArtistView>> {
    let artist = load_artist(&state, &id).await?;
    Ok(Json(artist_view(&state.db, &artist).await?))
}

pub async fn create_artist(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    SanitizedJson(payload): SanitizedJson<ArtistRequest>,
) -> Result<(StatusCode, Json<ArtistView>)> {
    let mut v = Validator::new();
    let name = v.required_text("name", payload.name, "Name is required");
    let genre = v.required_text("genre", payload.genre, "Genre is required");
    let image = v.required_text("image", payload.image, "Image is required");
    let country = v.required_text("country", payload.country, "Country is required");
    let biography = v.required_text("biography", payload.biography, "Biography is required");
    let formed = match payload.formed_year {
        Some(year) => formed_year(&mut v, &year),
        None => {
            v.add("formedYear", "Formed year is required");
            None
        }
    };
    v.finish()?;

    let (Some(name), Some(genre), Some(image), Some(country), Some(biography), Some(formed)) =
        (name, genre, image, country, biography, formed)
    else {
        return Err(AppError::Internal("Validated artist is incomplete".to_string()));
    };

    let candidates = payload
        .releases
        .map(IdListInput::into_ids)
        .unwrap_or_default();

    let now = Utc::now().into();
    let new_artist = artist::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        genre: Set(genre),
        image: Set(image),
        country: Set(country),
        formed_year: Set(formed),
        biography: Set(biography),
        releases: Set(IdList::default()),
        user_id: Set(caller.id),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let saved = IntegrityCoordinator::new(state.db.clone())
        .create_artist(new_artist, &candidates)
        .await?;

    Ok((StatusCode::CREATED, Json(artist_view(&state.db, &saved).await?)))
}

pub async fn update_artist(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<String>,
    SanitizedJson(payload): SanitizedJson<ArtistRequest>,
) -> Result<Json<ArtistView>> {
    let existing = load_artist(&state, &id).await?;
    ensure_can_mutate(&existing, caller.id, "update this artist")?;

    let mut v = Validator::new();
    let name = v.optional_text("name", payload.name, "Name cannot be empty");
    let genre = v.optional_text("genre", payload.genre, "Genre cannot be empty");
    let image = v.optional_text("image", payload.image, "Image cannot be empty");
    let country = v.optional_text("country", payload.country, "Country cannot be empty");
    let biography = v.optional_text("biography", payload.biography, "Biography cannot be empty");
    let formed = payload
        .formed_year
        .and_then(|year| formed_year(&mut v, &year));
    v.finish()?;

    let mut changes: artist::ActiveModel = existing.into();
    if let Some(name) = name {
        changes.name = Set(name);
    }
    if let Some(genre) = genre {
        changes.genre = Set(genre);
    }
    if let Some(image) = image {
        changes.image = Set(image);
    }
    if let Some(country) = country {
        changes.country = Set(country);
    }
    if let Some(biography) = biography {
        changes.biography = Set(biography);
    }
    if let Some(formed) = formed {
        changes.formed_year = Set(formed);
    }
    changes.updated_at = Set(Utc::now().into());

    let updated = ArtistRepository::new(state.db.clone()).update(changes).await?;
    tracing::info!(artist = %updated.id, "Artist updated");

    Ok(Json(artist_view(&state.db, &updated).await?))
}

pub async fn delete_artist(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let existing = load_artist(&state, &id).await?;
    ensure_can_mutate(&existing, caller.id, "delete this artist")?;

    IntegrityCoordinator::new(state.db.clone())
        .delete_artist(&existing)
        .await?;

    Ok(MessageResponse::new("Artist deleted successfully"))
}
