//! Public response shapes.
//!
//! Storage models for users are never serialized directly; everything leaving
//! the API goes through one of these projections. Referenced users and
//! artists are batch-loaded and stitched in here rather than by the store.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{
        entities::{artist, release, user},
        enums::ReleaseType,
        repositories::{ArtistRepository, ReleaseRepository, UserRepository},
        types::Review,
    },
    error::Result,
};

/// The caller's own record. Password hash and token digests never appear.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub favourites: Vec<Uuid>,
    pub is_email_confirmed: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<&user::Model> for UserView {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            favourites: user.favourites.as_slice().to_vec(),
            is_email_confirmed: user.is_email_confirmed,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Minimal identity used in signup and login responses.
#[derive(Debug, Serialize)]
pub struct AccountView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&user::Model> for AccountView {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
}

impl From<&user::Model> for UserSummary {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtistSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: Uuid,
    pub text: String,
    pub stars: i32,
    pub favourite_track: String,
    pub user_id: Uuid,
    /// `None` when the author no longer exists.
    pub user: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A release with its artist, owner and review authors expanded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseView {
    pub id: Uuid,
    pub title: String,
    pub image: String,
    pub artist_id: Option<Uuid>,
    pub artist: Option<ArtistSummary>,
    pub year: i32,
    pub genre: String,
    pub track_list: Vec<String>,
    pub release_type: ReleaseType,
    pub reviews: Vec<ReviewView>,
    pub user_id: Uuid,
    pub user: Option<UserSummary>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

/// A release without reviews, used inside artist and favourites listings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSummary {
    pub id: Uuid,
    pub title: String,
    pub image: String,
    pub artist_id: Option<Uuid>,
    pub year: i32,
    pub genre: String,
    pub track_list: Vec<String>,
    pub release_type: ReleaseType,
    pub user_id: Uuid,
}

impl From<&release::Model> for ReleaseSummary {
    fn from(release: &release::Model) -> Self {
        Self {
            id: release.id,
            title: release.title.clone(),
            image: release.image.clone(),
            artist_id: release.artist_id,
            year: release.year,
            genre: release.genre.clone(),
            track_list: release.track_list.0.clone(),
            release_type: release.release_type,
            user_id: release.user_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistView {
    pub id: Uuid,
    pub name: String,
    pub genre: String,
    pub image: String,
    pub country: String,
    pub formed_year: i32,
    pub biography: String,
    pub releases: Vec<ReleaseSummary>,
    pub user_id: Uuid,
    pub user: Option<UserSummary>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

async fn users_by_id(db: &DatabaseConnection, ids: BTreeSet<Uuid>) -> Result<HashMap<Uuid, UserSummary>> {
    let ids: Vec<Uuid> = ids.into_iter().collect();
    let users = UserRepository::new(db.clone()).find_by_ids(&ids).await?;
    Ok(users.iter().map(|u| (u.id, UserSummary::from(u))).collect())
}

fn review_view(review: &Review, users: &HashMap<Uuid, UserSummary>) -> ReviewView {
    ReviewView {
        id: review.id,
        text: review.text.clone(),
        stars: review.stars,
        favourite_track: review.favourite_track.clone(),
        user_id: review.user_id,
        user: users.get(&review.user_id).cloned(),
        created_at: review.created_at,
        updated_at: review.updated_at,
    }
}

/// Builds release views, loading every referenced artist and user in two
/// batched queries.
pub async fn release_views(db: &DatabaseConnection, releases: &[release::Model]) -> Result<Vec<ReleaseView>> {
    let artist_ids: Vec<Uuid> = releases
        .iter()
        .filter_map(|r| r.artist_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let artists: HashMap<Uuid, ArtistSummary> = ArtistRepository::new(db.clone())
        .find_by_ids(&artist_ids)
        .await?
        .into_iter()
        .map(|a| (a.id, ArtistSummary { id: a.id, name: a.name }))
        .collect();

    let user_ids: BTreeSet<Uuid> = releases
        .iter()
        .flat_map(|r| std::iter::once(r.user_id).chain(r.reviews.iter().map(|rv| rv.user_id)))
        .collect();
    let users = users_by_id(db, user_ids).await?;

    Ok(releases
        .iter()
        .map(|r| ReleaseView {
            id: r.id,
            title: r.title.clone(),
            image: r.image.clone(),
            artist_id: r.artist_id,
            artist: r.artist_id.and_then(|id| artists.get(&id).cloned()),
            year: r.year,
            genre: r.genre.clone(),
            track_list: r.track_list.0.clone(),
            release_type: r.release_type,
            reviews: r.reviews.iter().map(|rv| review_view(rv, &users)).collect(),
            user_id: r.user_id,
            user: users.get(&r.user_id).cloned(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
        .collect())
}

pub async fn release_view(db: &DatabaseConnection, release: &release::Model) -> Result<ReleaseView> {
    let mut views = release_views(db, std::slice::from_ref(release)).await?;
    Ok(views.remove(0))
}

pub async fn review_view_for(db: &DatabaseConnection, review: &Review) -> Result<ReviewView> {
    let users = users_by_id(db, BTreeSet::from([review.user_id])).await?;
    Ok(review_view(review, &users))
}

/// Builds artist views with their releases and owners expanded. Ids in an
/// artist's list that no longer resolve are skipped.
pub async fn artist_views(db: &DatabaseConnection, artists: &[artist::Model]) -> Result<Vec<ArtistView>> {
    let release_ids: Vec<Uuid> = artists
        .iter()
        .flat_map(|a| a.releases.as_slice().iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let releases: HashMap<Uuid, release::Model> = ReleaseRepository::new(db.clone())
        .find_by_ids(&release_ids)
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect();

    let users = users_by_id(db, artists.iter().map(|a| a.user_id).collect()).await?;

    Ok(artists
        .iter()
        .map(|a| ArtistView {
            id: a.id,
            name: a.name.clone(),
            genre: a.genre.clone(),
            image: a.image.clone(),
            country: a.country.clone(),
            formed_year: a.formed_year,
            biography: a.biography.clone(),
            releases: a
                .releases
                .as_slice()
                .iter()
                .filter_map(|id| releases.get(id).map(ReleaseSummary::from))
                .collect(),
            user_id: a.user_id,
            user: users.get(&a.user_id).cloned(),
            created_at: a.created_at,
            updated_at: a.updated_at,
        })
        .collect())
}

pub async fn artist_view(db: &DatabaseConnection, artist: &artist::Model) -> Result<ArtistView> {
    let mut views = artist_views(db, std::slice::from_ref(artist)).await?;
    Ok(views.remove(0))
}
