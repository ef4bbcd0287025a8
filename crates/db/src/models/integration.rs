use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::integration,
    types::{IntegrationPlatform, IntegrationStatus},
};

/// A tenant's configuration for one third-party platform.
///
/// `credentials` stays encrypted here; decryption is the vault's concern.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Integration {
    pub id: Uuid,
    pub tenant_id: i64,
    pub platform: IntegrationPlatform,
    pub status: IntegrationStatus,
    pub is_active: bool,
    pub credentials: Option<String>,
    pub configuration: serde_json::Value,
    pub metadata: serde_json::Value,
    #[ts(type = "Date | null")]
    pub activated_at: Option<DateTime<Utc>>,
    #[ts(type = "Date | null")]
    pub last_sync_at: Option<DateTime<Utc>>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct UpsertIntegration {
    pub status: Option<IntegrationStatus>,
    pub is_active: Option<bool>,
    pub configuration: Option<serde_json::Value>,
    /// Already-encrypted credential blob; `None` clears stored credentials.
    pub credentials: Option<String>,
}

impl Integration {
    fn from_model(model: integration::Model) -> Self {
        Self {
            id: model.uuid,
            tenant_id: model.tenant_id,
            platform: model.platform,
            status: model.status,
            is_active: model.is_active,
            credentials: model.credentials,
            configuration: model.configuration,
            metadata: model.metadata,
            activated_at: model.activated_at.map(Into::into),
            last_sync_at: model.last_sync_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    /// Outlet the platform's orders land on, when the owner bound one.
    pub fn configured_outlet_id(&self) -> Option<i64> {
        self.configuration.get("outletId").and_then(|v| v.as_i64())
    }

    /// The single active integration for a platform, tenant-agnostic.
    ///
    /// Webhook endpoints are shared across tenants and external platforms
    /// carry no tenant token, so the matched integration row is what resolves
    /// the acting tenant.
    pub async fn find_active_by_platform<C: ConnectionTrait>(
        db: &C,
        platform: IntegrationPlatform,
    ) -> Result<Option<Self>, DbErr> {
        let record = integration::Entity::find()
            .filter(integration::Column::Platform.eq(platform))
            .filter(integration::Column::IsActive.eq(true))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_all_by_tenant<C: ConnectionTrait>(
        db: &C,
        tenant_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = integration::Entity::find()
            .filter(integration::Column::TenantId.eq(tenant_id))
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_tenant_and_platform<C: ConnectionTrait>(
        db: &C,
        tenant_id: i64,
        platform: IntegrationPlatform,
    ) -> Result<Option<Self>, DbErr> {
        let record = integration::Entity::find()
            .filter(integration::Column::TenantId.eq(tenant_id))
            .filter(integration::Column::Platform.eq(platform))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// Create-or-update the (tenant, platform) row. Integrations are never
    /// hard-deleted; deactivation is an update with `is_active = false`.
    pub async fn upsert<C: ConnectionTrait>(
        db: &C,
        tenant_id: i64,
        platform: IntegrationPlatform,
        data: &UpsertIntegration,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let existing = integration::Entity::find()
            .filter(integration::Column::TenantId.eq(tenant_id))
            .filter(integration::Column::Platform.eq(platform))
            .one(db)
            .await?;

        if let Some(model) = existing {
            let mut active: integration::ActiveModel = model.into();
            active.status = Set(data.status.unwrap_or_default());
            active.is_active = Set(data.is_active.unwrap_or(false));
            active.configuration =
                Set(data.configuration.clone().unwrap_or_else(empty_object));
            active.credentials = Set(data.credentials.clone());
            active.updated_at = Set(now.into());
            return Ok(Self::from_model(active.update(db).await?));
        }

        let active = integration::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            platform: Set(platform),
            status: Set(data.status.unwrap_or_default()),
            is_active: Set(data.is_active.unwrap_or(false)),
            configuration: Set(data.configuration.clone().unwrap_or_else(empty_object)),
            credentials: Set(data.credentials.clone()),
            metadata: Set(empty_object()),
            activated_at: Set(None),
            last_sync_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        match active.insert(db).await {
            Ok(model) => Ok(Self::from_model(model)),
            Err(err) if crate::is_unique_violation(&err) => {
                // Concurrent save of the same (tenant, platform); retry as an
                // update against the row that won.
                tracing::warn!(
                    tenant_id,
                    %platform,
                    "Concurrent integration upsert detected; retrying as update"
                );
                let model = integration::Entity::find()
                    .filter(integration::Column::TenantId.eq(tenant_id))
                    .filter(integration::Column::Platform.eq(platform))
                    .one(db)
                    .await?
                    .ok_or(DbErr::RecordNotFound("Integration not found".to_string()))?;
                let mut active: integration::ActiveModel = model.into();
                active.status = Set(data.status.unwrap_or_default());
                active.is_active = Set(data.is_active.unwrap_or(false));
                active.configuration =
                    Set(data.configuration.clone().unwrap_or_else(empty_object));
                active.credentials = Set(data.credentials.clone());
                active.updated_at = Set(now.into());
                Ok(Self::from_model(active.update(db).await?))
            }
            Err(err) => Err(err),
        }
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
