use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entities::item;

/// Internal catalog item, matched best-effort against external order lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CatalogItem {
    pub id: i64,
    pub outlet_id: i64,
    pub sku: Option<String>,
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct CreateCatalogItem {
    pub outlet_id: i64,
    pub sku: Option<String>,
    pub name: String,
    pub price: f64,
}

impl CatalogItem {
    fn from_model(model: item::Model) -> Self {
        Self {
            id: model.id,
            outlet_id: model.outlet_id,
            sku: model.sku,
            name: model.name,
            price: model.price,
        }
    }

    /// Match by SKU or by name within the outlet. External catalogs are not
    /// guaranteed to align with ours, so no match is a normal outcome.
    pub async fn find_outlet_match<C: ConnectionTrait>(
        db: &C,
        outlet_id: i64,
        sku: Option<&str>,
        name: Option<&str>,
    ) -> Result<Option<Self>, DbErr> {
        let sku = sku.filter(|s| !s.is_empty());
        let name = name.filter(|n| !n.is_empty());
        if sku.is_none() && name.is_none() {
            return Ok(None);
        }

        let mut any = Condition::any();
        if let Some(sku) = sku {
            any = any.add(item::Column::Sku.eq(sku));
        }
        if let Some(name) = name {
            any = any.add(item::Column::Name.eq(name));
        }

        let record = item::Entity::find()
            .filter(item::Column::OutletId.eq(outlet_id))
            .filter(any)
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateCatalogItem,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = item::ActiveModel {
            outlet_id: Set(data.outlet_id),
            sku: Set(data.sku.clone()),
            name: Set(data.name.clone()),
            price: Set(data.price),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        Ok(Self::from_model(active.insert(db).await?))
    }
}
