use sea_orm::entity::prelude::*;

use crate::db::types::IdList;

/// Stored user record. Never serialized directly; see `handlers::views::UserView`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    #[sea_orm(column_type = "Json")]
    pub favourites: IdList,
    pub is_email_confirmed: bool,
    pub email_confirmation_digest: Option<String>,
    pub email_confirmation_expires_at: Option<DateTimeWithTimeZone>,
    pub password_reset_digest: Option<String>,
    pub password_reset_expires_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// A validated signup. Building the active model is the only place a
/// plaintext password turns into a stored hash.
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn into_active_model(self) -> crate::error::Result<ActiveModel> {
        use sea_orm::Set;

        let password_hash = crate::services::credentials::hash_password(&self.password)?;
        let now: DateTimeWithTimeZone = chrono::Utc::now().into();
        Ok(ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(self.username),
            email: Set(self.email),
            password_hash: Set(password_hash),
            favourites: Set(IdList::default()),
            is_email_confirmed: Set(false),
            email_confirmation_digest: Set(None),
            email_confirmation_expires_at: Set(None),
            password_reset_digest: Set(None),
            password_reset_expires_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        })
    }
}
