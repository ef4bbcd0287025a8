use sea_orm::entity::prelude::*;

use crate::types::{IntegrationPlatform, IntegrationStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "integrations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub tenant_id: i64,
    pub platform: IntegrationPlatform,
    pub status: IntegrationStatus,
    pub is_active: bool,
    pub credentials: Option<String>,
    pub configuration: Json,
    pub metadata: Json,
    pub activated_at: Option<DateTimeUtc>,
    pub last_sync_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
