use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::types::IdList;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "artists")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub genre: String,
    pub image: String,
    pub country: String,
    pub formed_year: i32,
    #[sea_orm(column_type = "Text")]
    pub biography: String,
    /// Back-reference to releases whose `artist_id` points here.
    #[sea_orm(column_type = "Json")]
    pub releases: IdList,
    pub user_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
