use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::{
    enums::ReleaseType,
    types::{Reviews, TrackList},
};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "releases")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub image: String,
    pub artist_id: Option<Uuid>,
    pub year: i32,
    pub genre: String,
    #[sea_orm(column_type = "Json")]
    pub track_list: TrackList,
    pub release_type: ReleaseType,
    #[sea_orm(column_type = "Json")]
    pub reviews: Reviews,
    pub user_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
