//! Keeps the denormalized links between users, artists, releases and reviews
//! in step.
//!
//! The store gives no multi-row atomicity, so each cross-entity change is a
//! sequence of single-row writes. Removal steps always run before additive
//! ones: a failure then leaves an orphaned id in a list (harmless) rather than
//! a reference to a row that no longer exists. Failures in a secondary step
//! are logged and not rolled back.

use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseConnection, Set};
use uuid::Uuid;

use crate::{
    db::{
        entities::{artist, release, user},
        repositories::{ArtistRepository, ReleaseRepository, UserRepository},
        types::{IdList, Review, Reviews},
    },
    error::{AppError, Result},
};

pub struct IntegrityCoordinator {
    users: UserRepository,
    artists: ArtistRepository,
    releases: ReleaseRepository,
}

impl IntegrityCoordinator {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: UserRepository::new(db.clone()),
            artists: ArtistRepository::new(db.clone()),
            releases: ReleaseRepository::new(db),
        }
    }

    // ------------------------------------------------------------------
    // Artist <-> Release
    // ------------------------------------------------------------------

    /// Inserts the release, then appends it to its artist's release list.
    pub async fn create_release(&self, new_release: release::ActiveModel) -> Result<release::Model> {
        let saved = self.releases.create(new_release).await?;
        tracing::info!(release = %saved.id, owner = %saved.user_id, "Release created");

        if let Some(artist_id) = saved.artist_id {
            if let Err(e) = self.link(artist_id, saved.id).await {
                tracing::warn!(
                    release = %saved.id,
                    artist = %artist_id,
                    "Release created but artist back-reference not added: {}",
                    e
                );
            }
        }

        Ok(saved)
    }

    /// Persists an allow-listed release update, moving the artist
    /// back-reference when the artist changes.
    pub async fn update_release(
        &self,
        existing: &release::Model,
        changes: release::ActiveModel,
    ) -> Result<release::Model> {
        let new_artist = match &changes.artist_id {
            ActiveValue::Set(artist_id) => Some(*artist_id),
            _ => None,
        };
        let moved = new_artist.filter(|artist_id| *artist_id != existing.artist_id);

        if moved.is_some() {
            if let Some(old_artist) = existing.artist_id {
                if let Err(e) = self.unlink(old_artist, existing.id).await {
                    tracing::warn!(
                        release = %existing.id,
                        artist = %old_artist,
                        "Could not remove release from previous artist: {}",
                        e
                    );
                }
            }
        }

        let updated = self.releases.update(changes).await?;

        if let Some(Some(artist_id)) = moved {
            if let Err(e) = self.link(artist_id, updated.id).await {
                tracing::warn!(
                    release = %updated.id,
                    artist = %artist_id,
                    "Release updated but new artist back-reference not added: {}",
                    e
                );
            }
        }

        Ok(updated)
    }

    /// Detaches the release from its artist, then deletes it. The detach is
    /// best-effort; success is reported only if the delete removed the row.
    pub async fn delete_release(&self, existing: &release::Model) -> Result<()> {
        if let Some(artist_id) = existing.artist_id {
            if let Err(e) = self.unlink(artist_id, existing.id).await {
                tracing::warn!(
                    release = %existing.id,
                    artist = %artist_id,
                    "Could not remove release from artist before deletion: {}",
                    e
                );
            }
        }

        if !self.releases.delete(existing.id).await? {
            return Err(AppError::NotFound("Release not found".to_string()));
        }
        tracing::info!(release = %existing.id, "Release deleted");
        Ok(())
    }

    /// Clears the artist reference on all its releases, then deletes the
    /// artist. If clearing fails the artist is left in place.
    pub async fn delete_artist(&self, existing: &artist::Model) -> Result<()> {
        let cleared = self.releases.clear_artist(existing.id).await.map_err(|e| {
            tracing::error!(
                artist = %existing.id,
                "Aborting artist deletion, releases could not be detached: {}",
                e
            );
            e
        })?;
        tracing::debug!(artist = %existing.id, cleared, "Detached releases from artist");

        if !self.artists.delete(existing.id).await? {
            return Err(AppError::NotFound("Artist not found".to_string()));
        }
        tracing::info!(artist = %existing.id, "Artist deleted");
        Ok(())
    }

    /// Creates an artist claiming the given releases.
    ///
    /// Candidate ids that do not resolve to a release are dropped silently.
    /// Claimed releases are detached from whichever artist held them before.
    pub async fn create_artist(
        &self,
        mut new_artist: artist::ActiveModel,
        candidate_releases: &[Uuid],
    ) -> Result<artist::Model> {
        let owner = match &new_artist.user_id {
            ActiveValue::Set(id) | ActiveValue::Unchanged(id) => Some(*id),
            ActiveValue::NotSet => None,
        };
        let (found, foreign): (Vec<release::Model>, Vec<release::Model>) = self
            .releases
            .find_by_ids(candidate_releases)
            .await?
            .into_iter()
            .partition(|release| Some(release.user_id) == owner);
        if !foreign.is_empty() {
            let skipped: Vec<Uuid> = foreign.iter().map(|release| release.id).collect();
            tracing::info!(?skipped, "New artist cannot claim releases owned by another user");
        }

        let valid: Vec<Uuid> = candidate_releases
            .iter()
            .filter(|id| found.iter().any(|release| &release.id == *id))
            .copied()
            .collect();
        if valid.len() != candidate_releases.len() {
            tracing::debug!(
                requested = candidate_releases.len(),
                kept = valid.len(),
                "Dropped unknown or foreign release ids from new artist"
            );
        }

        new_artist.releases = Set(IdList::from(valid.clone()));
        let saved = self.artists.create(new_artist).await?;
        tracing::info!(artist = %saved.id, owner = %saved.user_id, "Artist created");

        for release in found.iter().filter(|r| r.artist_id.is_some_and(|a| a != saved.id)) {
            if let Some(previous) = release.artist_id {
                if let Err(e) = self.unlink(previous, release.id).await {
                    tracing::warn!(
                        release = %release.id,
                        artist = %previous,
                        "Could not detach release from previous artist: {}",
                        e
                    );
                }
            }
        }

        if let Err(e) = self.releases.set_artist(&valid, saved.id).await {
            tracing::warn!(
                artist = %saved.id,
                "Artist created but releases not pointed at it: {}",
                e
            );
        }

        Ok(saved)
    }

    async fn link(&self, artist_id: Uuid, release_id: Uuid) -> Result<()> {
        let artist = self
            .artists
            .find_by_id(artist_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Artist not found".to_string()))?;
        let mut releases = artist.releases.clone();
        if !releases.insert(release_id) {
            return Ok(());
        }
        let mut active: artist::ActiveModel = artist.into();
        active.releases = Set(releases);
        active.updated_at = Set(Utc::now().into());
        self.artists.update(active).await?;
        Ok(())
    }

    async fn unlink(&self, artist_id: Uuid, release_id: Uuid) -> Result<()> {
        let Some(artist) = self.artists.find_by_id(artist_id).await? else {
            return Ok(());
        };
        let mut releases = artist.releases.clone();
        if !releases.remove(&release_id) {
            return Ok(());
        }
        let mut active: artist::ActiveModel = artist.into();
        active.releases = Set(releases);
        active.updated_at = Set(Utc::now().into());
        self.artists.update(active).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // User <-> Favourites
    // ------------------------------------------------------------------

    /// Adds a favourite. Adding one already present is a successful no-op.
    pub async fn add_favourite(&self, user: user::Model, release_id: Uuid) -> Result<user::Model> {
        let mut favourites = user.favourites.clone();
        if !favourites.insert(release_id) {
            return Ok(user);
        }
        let mut active: user::ActiveModel = user.into();
        active.favourites = Set(favourites);
        active.updated_at = Set(Utc::now().into());
        self.users.update(active).await
    }

    pub async fn remove_favourite(&self, user: user::Model, release_id: Uuid) -> Result<user::Model> {
        let mut favourites = user.favourites.clone();
        if !favourites.remove(&release_id) {
            return Err(AppError::NotFound(
                "Release not found in favourites".to_string(),
            ));
        }
        let mut active: user::ActiveModel = user.into();
        active.favourites = Set(favourites);
        active.updated_at = Set(Utc::now().into());
        self.users.update(active).await
    }

    // ------------------------------------------------------------------
    // Release <-> Review (embedded; one row write each)
    // ------------------------------------------------------------------

    pub async fn add_review(&self, release: release::Model, review: Review) -> Result<release::Model> {
        let mut reviews = release.reviews.clone();
        reviews.push(review);
        self.save_reviews(release, reviews).await
    }

    /// Applies `edit` to the review with `review_id` and persists the parent.
    pub async fn update_review<F>(
        &self,
        release: release::Model,
        review_id: Uuid,
        edit: F,
    ) -> Result<release::Model>
    where
        F: FnOnce(&mut Review),
    {
        let mut reviews = release.reviews.clone();
        let review = reviews
            .get_mut(&review_id)
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;
        edit(review);
        review.updated_at = Utc::now();
        self.save_reviews(release, reviews).await
    }

    pub async fn delete_review(&self, release: release::Model, review_id: Uuid) -> Result<release::Model> {
        let mut reviews = release.reviews.clone();
        reviews
            .remove(&review_id)
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;
        self.save_reviews(release, reviews).await
    }

    async fn save_reviews(&self, release: release::Model, reviews: Reviews) -> Result<release::Model> {
        let mut active: release::ActiveModel = release.into();
        active.reviews = Set(reviews);
        active.updated_at = Set(Utc::now().into());
        self.releases.update(active).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn create_release_appends_to_artist() {
        let db = setup_test_db().await;
        let owner = create_test_user(&db, "owner", "owner@example.com", true).await;
        let artist = create_test_artist(&db, owner.id, "Broadcast").await;

        let coordinator = IntegrityCoordinator::new(db.clone());
        let release = coordinator
            .create_release(test_release_model(owner.id, Some(artist.id), "Tender Buttons"))
            .await
            .unwrap();

        let artist = ArtistRepository::new(db).find_by_id(artist.id).await.unwrap().unwrap();
        assert_eq!(artist.releases.as_slice(), &[release.id]);
    }

    #[tokio::test]
    async fn create_release_keeps_release_when_artist_missing() {
        let db = setup_test_db().await;
        let owner = create_test_user(&db, "owner", "owner@example.com", true).await;
        let ghost_artist = Uuid::new_v4();

        let coordinator = IntegrityCoordinator::new(db.clone());
        let release = coordinator
            .create_release(test_release_model(owner.id, Some(ghost_artist), "Orphan"))
            .await
            .unwrap();

        let stored = ReleaseRepository::new(db).find_by_id(release.id).await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn update_release_moves_back_reference() {
        let db = setup_test_db().await;
        let owner = create_test_user(&db, "owner", "owner@example.com", true).await;
        let first = create_test_artist(&db, owner.id, "First").await;
        let second = create_test_artist(&db, owner.id, "Second").await;
        let release = create_test_release(&db, owner.id, Some(first.id), "Moved").await;

        let coordinator = IntegrityCoordinator::new(db.clone());
        let mut changes: release::ActiveModel = release.clone().into();
        changes.artist_id = Set(Some(second.id));
        coordinator.update_release(&release, changes).await.unwrap();

        let artists = ArtistRepository::new(db);
        let first = artists.find_by_id(first.id).await.unwrap().unwrap();
        let second = artists.find_by_id(second.id).await.unwrap().unwrap();
        assert!(first.releases.is_empty());
        assert_eq!(second.releases.as_slice(), &[release.id]);
    }

    #[tokio::test]
    async fn create_artist_drops_unknown_releases_and_claims_known_ones() {
        let db = setup_test_db().await;
        let owner = create_test_user(&db, "owner", "owner@example.com", true).await;
        let previous = create_test_artist(&db, owner.id, "Previous").await;
        let claimed = create_test_release(&db, owner.id, Some(previous.id), "Claimed").await;
        let unknown = Uuid::new_v4();

        let coordinator = IntegrityCoordinator::new(db.clone());
        let artist = coordinator
            .create_artist(test_artist_model(owner.id, "New Home"), &[claimed.id, unknown])
            .await
            .unwrap();

        assert_eq!(artist.releases.as_slice(), &[claimed.id]);

        let claimed = ReleaseRepository::new(db.clone())
            .find_by_id(claimed.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.artist_id, Some(artist.id));

        let previous = ArtistRepository::new(db).find_by_id(previous.id).await.unwrap().unwrap();
        assert!(previous.releases.is_empty());
    }

    #[tokio::test]
    async fn create_artist_leaves_other_users_releases_alone() {
        let db = setup_test_db().await;
        let owner = create_test_user(&db, "owner", "owner@example.com", true).await;
        let other = create_test_user(&db, "other", "other@example.com", true).await;
        let theirs = create_test_artist(&db, other.id, "Theirs").await;
        let foreign = create_test_release(&db, other.id, Some(theirs.id), "Not Yours").await;
        let own = create_test_release(&db, owner.id, None, "Yours").await;

        let coordinator = IntegrityCoordinator::new(db.clone());
        let artist = coordinator
            .create_artist(test_artist_model(owner.id, "Claimant"), &[foreign.id, own.id])
            .await
            .unwrap();

        assert_eq!(artist.releases.as_slice(), &[own.id]);

        let releases = ReleaseRepository::new(db.clone());
        let foreign = releases.find_by_id(foreign.id).await.unwrap().unwrap();
        assert_eq!(foreign.artist_id, Some(theirs.id));

        let theirs = ArtistRepository::new(db).find_by_id(theirs.id).await.unwrap().unwrap();
        assert_eq!(theirs.releases.as_slice(), &[foreign.id]);
    }

    #[tokio::test]
    async fn remove_absent_favourite_is_not_found() {
        let db = setup_test_db().await;
        let user = create_test_user(&db, "fan", "fan@example.com", true).await;

        let coordinator = IntegrityCoordinator::new(db);
        let err = coordinator
            .remove_favourite(user, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_missing_review_is_not_found() {
        let db = setup_test_db().await;
        let owner = create_test_user(&db, "owner", "owner@example.com", true).await;
        let release = create_test_release(&db, owner.id, None, "No Reviews").await;

        let coordinator = IntegrityCoordinator::new(db);
        let err = coordinator
            .update_review(release, Uuid::new_v4(), |review| review.stars = 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
