//! Values stored as JSON columns.
//!
//! The back-reference lists (`artists.releases`, `users.favourites`), the
//! track list and the embedded reviews all live inside their parent row, so a
//! single row write is the unit of atomicity for each of them.

use chrono::{DateTime, Utc};
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An ordered list of ids with set-like mutation helpers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct IdList(pub Vec<Uuid>);

impl IdList {
    pub fn contains(&self, id: &Uuid) -> bool {
        self.0.contains(id)
    }

    /// Appends `id` unless already present. Returns whether the list changed.
    pub fn insert(&mut self, id: Uuid) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    /// Removes every occurrence of `id`. Returns whether the list changed.
    pub fn remove(&mut self, id: &Uuid) -> bool {
        let before = self.0.len();
        self.0.retain(|existing| existing != id);
        before != self.0.len()
    }

    pub fn as_slice(&self) -> &[Uuid] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Uuid>> for IdList {
    fn from(ids: Vec<Uuid>) -> Self {
        let mut list = IdList::default();
        for id in ids {
            list.insert(id);
        }
        list
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct TrackList(pub Vec<String>);

/// A review embedded in its parent release.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub text: String,
    pub stars: i32,
    pub favourite_track: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Reviews(pub Vec<Review>);

impl Reviews {
    pub fn get(&self, id: &Uuid) -> Option<&Review> {
        self.0.iter().find(|review| &review.id == id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Review> {
        self.0.iter_mut().find(|review| &review.id == id)
    }

    pub fn push(&mut self, review: Review) {
        self.0.push(review);
    }

    /// Removes the review with `id`, returning it if it was present.
    pub fn remove(&mut self, id: &Uuid) -> Option<Review> {
        let index = self.0.iter().position(|review| &review.id == id)?;
        Some(self.0.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Review> {
        self.0.iter()
    }
}
