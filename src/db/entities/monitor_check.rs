use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::CheckStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "monitor_checks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub service: String,
    pub status: CheckStatus,
    #[sea_orm(nullable)]
    pub response_time_ms: Option<f64>,
    #[sea_orm(nullable)]
    pub http_status: Option<i32>,
    pub checked_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
