use chrono::Utc;
use sea_orm::{
    prelude::DateTimeWithTimeZone, sea_query::Expr, ActiveModelTrait, ColumnTrait,
    DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::db::entities::{artist, release, user};
use crate::error::Result;
use crate::services::tokens::{digest_token, TokenPurpose};

pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<user::Model>> {
        Ok(user::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(user::Entity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await?)
    }

    pub async fn create(&self, user: user::ActiveModel) -> Result<user::Model> {
        Ok(user.insert(&self.db).await?)
    }

    pub async fn update(&self, user: user::ActiveModel) -> Result<user::Model> {
        Ok(user.update(&self.db).await?)
    }

    /// Stores a new pending token digest, replacing any previous one of the
    /// same purpose.
    pub async fn store_token(
        &self,
        user: user::Model,
        purpose: TokenPurpose,
        digest: Option<String>,
        expires_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<user::Model> {
        let mut active: user::ActiveModel = user.into();
        let expires_at = expires_at.map(Into::into);
        match purpose {
            TokenPurpose::EmailConfirmation => {
                active.email_confirmation_digest = Set(digest);
                active.email_confirmation_expires_at = Set(expires_at);
            }
            TokenPurpose::PasswordReset => {
                active.password_reset_digest = Set(digest);
                active.password_reset_expires_at = Set(expires_at);
            }
        }
        active.updated_at = Set(Utc::now().into());
        self.update(active).await
    }

    pub async fn clear_token(&self, user: user::Model, purpose: TokenPurpose) -> Result<user::Model> {
        self.store_token(user, purpose, None, None).await
    }

    /// Redeems a raw single-use token.
    ///
    /// Looks up the user holding the digest of `raw`, rejects it if expired,
    /// clears the digest and expiry, and applies `apply` in the same write.
    /// Returns `None` when no live token matches.
    pub async fn consume_token<F>(
        &self,
        raw: &str,
        purpose: TokenPurpose,
        apply: F,
    ) -> Result<Option<user::Model>>
    where
        F: FnOnce(&mut user::ActiveModel),
    {
        let digest = digest_token(raw);
        let column = match purpose {
            TokenPurpose::EmailConfirmation => user::Column::EmailConfirmationDigest,
            TokenPurpose::PasswordReset => user::Column::PasswordResetDigest,
        };

        let Some(found) = user::Entity::find()
            .filter(column.eq(digest))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let expires_at = match purpose {
            TokenPurpose::EmailConfirmation => found.email_confirmation_expires_at,
            TokenPurpose::PasswordReset => found.password_reset_expires_at,
        };
        let now = Utc::now();
        if expires_at.map_or(true, |exp| exp.to_utc() <= now) {
            tracing::debug!(user = %found.id, ?purpose, "Single-use token expired");
            return Ok(None);
        }

        let mut active: user::ActiveModel = found.into();
        match purpose {
            TokenPurpose::EmailConfirmation => {
                active.email_confirmation_digest = Set(None);
                active.email_confirmation_expires_at = Set(None);
            }
            TokenPurpose::PasswordReset => {
                active.password_reset_digest = Set(None);
                active.password_reset_expires_at = Set(None);
            }
        }
        apply(&mut active);
        active.updated_at = Set(now.into());

        Ok(Some(self.update(active).await?))
    }
}

pub struct ArtistRepository {
    db: DatabaseConnection,
}

impl ArtistRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_all(&self) -> Result<Vec<artist::Model>> {
        Ok(artist::Entity::find()
            .order_by_asc(artist::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<artist::Model>> {
        Ok(artist::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<artist::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(artist::Entity::find()
            .filter(artist::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await?)
    }

    pub async fn create(&self, artist: artist::ActiveModel) -> Result<artist::Model> {
        Ok(artist.insert(&self.db).await?)
    }

    pub async fn update(&self, artist: artist::ActiveModel) -> Result<artist::Model> {
        Ok(artist.update(&self.db).await?)
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = artist::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

pub struct ReleaseRepository {
    db: DatabaseConnection,
}

impl ReleaseRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_all(&self) -> Result<Vec<release::Model>> {
        Ok(release::Entity::find()
            .order_by_desc(release::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<release::Model>> {
        Ok(release::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<release::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(release::Entity::find()
            .filter(release::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await?)
    }

    pub async fn find_by_owner(&self, user_id: Uuid) -> Result<Vec<release::Model>> {
        Ok(release::Entity::find()
            .filter(release::Column::UserId.eq(user_id))
            .order_by_desc(release::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn create(&self, release: release::ActiveModel) -> Result<release::Model> {
        Ok(release.insert(&self.db).await?)
    }

    pub async fn update(&self, release: release::ActiveModel) -> Result<release::Model> {
        Ok(release.update(&self.db).await?)
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = release::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    /// Points every release in `ids` at `artist_id`.
    pub async fn set_artist(&self, ids: &[Uuid], artist_id: Uuid) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let now: DateTimeWithTimeZone = Utc::now().into();
        let result = release::Entity::update_many()
            .col_expr(release::Column::ArtistId, Expr::value(Some(artist_id)))
            .col_expr(release::Column::UpdatedAt, Expr::value(now))
            .filter(release::Column::Id.is_in(ids.iter().copied()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Clears the artist reference on every release pointing at `artist_id`.
    pub async fn clear_artist(&self, artist_id: Uuid) -> Result<u64> {
        let result = release::Entity::update_many()
            .col_expr(release::Column::ArtistId, Expr::value(Option::<Uuid>::None))
            .filter(release::Column::ArtistId.eq(artist_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
