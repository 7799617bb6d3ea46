use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{
        entities::user,
        repositories::{ReleaseRepository, UserRepository},
    },
    error::{AppError, Result},
    handlers::views::{release_views, ReleaseSummary, ReleaseView, UserSummary, UserView},
    middleware::CurrentUser,
    services::IntegrityCoordinator,
    state::AppState,
    validation::parse_id,
};

#[derive(Serialize)]
pub struct ProfileResponse {
    pub user: UserSummary,
    pub uploads: Vec<ReleaseView>,
}

#[derive(Serialize)]
pub struct FavouritesResponse {
    pub message: String,
    pub favourites: Vec<Uuid>,
}

async fn load_user(state: &AppState, raw_id: &str) -> Result<user::Model> {
    let id = parse_id(raw_id)?;
    UserRepository::new(state.db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Favourites may only be changed by the user they belong to.
fn ensure_self(caller: &user::Model, user_id: Uuid) -> Result<()> {
    if caller.id == user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You are not authorized to change another user's favourites.".to_string(),
        ))
    }
}

pub async fn get_current_user(Extension(CurrentUser(caller)): Extension<CurrentUser>) -> Json<UserView> {
    Json(UserView::from(&caller))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProfileResponse>> {
    let user = load_user(&state, &user_id).await?;
    let uploads = ReleaseRepository::new(state.db.clone())
        .find_by_owner(user.id)
        .await?;

    Ok(Json(ProfileResponse {
        user: UserSummary::from(&user),
        uploads: release_views(&state.db, &uploads).await?,
    }))
}

pub async fn get_uploads(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ReleaseView>>> {
    let user = load_user(&state, &user_id).await?;
    let uploads = ReleaseRepository::new(state.db.clone())
        .find_by_owner(user.id)
        .await?;

    Ok(Json(release_views(&state.db, &uploads).await?))
}

/// Favourite releases in the order they were added. Ids whose release has
/// since been deleted are skipped.
pub async fn get_favourites(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ReleaseSummary>>> {
    let user = load_user(&state, &user_id).await?;
    let mut found: HashMap<Uuid, _> = ReleaseRepository::new(state.db.clone())
        .find_by_ids(user.favourites.as_slice())
        .await?
        .into_iter()
        .map(|release| (release.id, release))
        .collect();

    let favourites = user
        .favourites
        .as_slice()
        .iter()
        .filter_map(|id| found.remove(id))
        .map(|release| ReleaseSummary::from(&release))
        .collect();

    Ok(Json(favourites))
}

pub async fn add_favourite(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path((user_id, release_id)): Path<(String, String)>,
) -> Result<Json<FavouritesResponse>> {
    let user_id = parse_id(&user_id)?;
    let release_id = parse_id(&release_id)?;
    ensure_self(&caller, user_id)?;

    ReleaseRepository::new(state.db.clone())
        .find_by_id(release_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Release not found".to_string()))?;

    let user = IntegrityCoordinator::new(state.db.clone())
        .add_favourite(caller, release_id)
        .await?;
    tracing::info!(user = %user.id, release = %release_id, "Favourite added");

    Ok(Json(FavouritesResponse {
        message: "Release added to favourites".to_string(),
        favourites: user.favourites.as_slice().to_vec(),
    }))
}

pub async fn remove_favourite(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path((user_id, release_id)): Path<(String, String)>,
) -> Result<Json<FavouritesResponse>> {
    let user_id = parse_id(&user_id)?;
    let release_id = parse_id(&release_id)?;
    ensure_self(&caller, user_id)?;

    let user = IntegrityCoordinator::new(state.db.clone())
        .remove_favourite(caller, release_id)
        .await?;
    tracing::info!(user = %user.id, release = %release_id, "Favourite removed");

    Ok(Json(FavouritesResponse {
        message: "Release removed from favourites".to_string(),
        favourites: user.favourites.as_slice().to_vec(),
    }))
}
