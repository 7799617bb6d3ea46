//! Who may mutate what. Pure decisions, no I/O.

use uuid::Uuid;

use crate::{
    db::{entities::artist, entities::release, types::Review},
    error::{AppError, Result},
};

pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Owned for artist::Model {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

impl Owned for release::Model {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

/// A review belongs to its author, not to the owner of the parent release.
impl Owned for Review {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

pub fn can_mutate<R: Owned + ?Sized>(resource: &R, user_id: Uuid) -> bool {
    resource.owner_id() == user_id
}

/// `action` completes the sentence "You are not authorized to ...".
pub fn ensure_can_mutate<R: Owned + ?Sized>(resource: &R, user_id: Uuid, action: &str) -> Result<()> {
    if can_mutate(resource, user_id) {
        Ok(())
    } else {
        tracing::info!(
            owner = %resource.owner_id(),
            user = %user_id,
            "Rejected attempt to {}",
            action
        );
        Err(AppError::Forbidden(format!("You are not authorized to {}.", action)))
    }
}
