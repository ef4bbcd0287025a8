use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{transaction, transaction_item},
    models::payment::CreatePayment,
    types::OrderType,
};

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Transaction not found")]
    NotFound,
}

/// A durable order record. The transaction number is globally unique and,
/// for webhook-created orders, derived deterministically from
/// `{PLATFORM}-{externalOrderId}` so redelivered creations collapse onto one
/// row.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Transaction {
    pub id: Uuid,
    pub transaction_number: String,
    pub order_type: OrderType,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax_amount: f64,
    pub service_charge: f64,
    pub total: f64,
    pub status: String,
    pub outlet_id: i64,
    pub notes: Option<String>,
    #[ts(type = "Date | null")]
    pub completed_at: Option<DateTime<Utc>>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TransactionItem {
    pub item_id: Option<i64>,
    pub item_name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub subtotal: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateTransaction {
    pub transaction_number: String,
    pub order_type: OrderType,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub subtotal: f64,
    pub status: String,
    pub outlet_id: i64,
    pub notes: Option<String>,
    pub items: Vec<CreateTransactionItem>,
    pub payment: CreatePayment,
}

#[derive(Debug, Clone)]
pub struct CreateTransactionItem {
    pub item_id: Option<i64>,
    pub item_name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub subtotal: f64,
    pub notes: Option<String>,
}

impl Transaction {
    fn from_model(model: transaction::Model) -> Self {
        Self {
            id: model.uuid,
            transaction_number: model.transaction_number,
            order_type: model.order_type,
            customer_name: model.customer_name,
            customer_phone: model.customer_phone,
            subtotal: model.subtotal,
            discount_amount: model.discount_amount,
            tax_amount: model.tax_amount,
            service_charge: model.service_charge,
            total: model.total,
            status: model.status,
            outlet_id: model.outlet_id,
            notes: model.notes,
            completed_at: model.completed_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub async fn find_by_number<C: ConnectionTrait>(
        db: &C,
        transaction_number: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = transaction::Entity::find()
            .filter(transaction::Column::TransactionNumber.eq(transaction_number))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_by_uuid<C: ConnectionTrait>(
        db: &C,
        uuid: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = transaction::Entity::find()
            .filter(transaction::Column::Uuid.eq(uuid))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// Insert the transaction together with its line items and the single
    /// payment record. Run inside a database transaction when atomicity with
    /// other writes matters; the unique index on `transaction_number` makes a
    /// lost duplicate race surface as a unique violation for the caller to
    /// translate into the update path.
    pub async fn create_with_children<C: ConnectionTrait>(
        db: &C,
        data: &CreateTransaction,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = transaction::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            transaction_number: Set(data.transaction_number.clone()),
            order_type: Set(data.order_type),
            customer_name: Set(data.customer_name.clone()),
            customer_phone: Set(data.customer_phone.clone()),
            subtotal: Set(data.subtotal),
            discount_amount: Set(0.0),
            tax_amount: Set(0.0),
            service_charge: Set(0.0),
            total: Set(data.subtotal),
            status: Set(data.status.clone()),
            outlet_id: Set(data.outlet_id),
            notes: Set(data.notes.clone()),
            completed_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        for item in &data.items {
            let active = transaction_item::ActiveModel {
                transaction_id: Set(model.id),
                item_id: Set(item.item_id),
                item_name: Set(item.item_name.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                subtotal: Set(item.subtotal),
                discount_amount: Set(0.0),
                notes: Set(item.notes.clone()),
                created_at: Set(now.into()),
                ..Default::default()
            };
            active.insert(db).await?;
        }

        crate::models::payment::insert_for_transaction(db, model.id, &data.payment).await?;

        Ok(Self::from_model(model))
    }

    /// Status-update path for redeliveries of a known order. Only the status
    /// and the completion timestamp move; amounts, items and payments were
    /// fixed at creation.
    pub async fn update_status<C: ConnectionTrait>(
        db: &C,
        uuid: Uuid,
        status: &str,
        completed: bool,
    ) -> Result<Self, TransactionError> {
        let record = transaction::Entity::find()
            .filter(transaction::Column::Uuid.eq(uuid))
            .one(db)
            .await?
            .ok_or(TransactionError::NotFound)?;

        let now = Utc::now();
        let mut active: transaction::ActiveModel = record.into();
        active.status = Set(status.to_string());
        active.completed_at = Set(completed.then(|| now.into()));
        active.updated_at = Set(now.into());
        Ok(Self::from_model(active.update(db).await?))
    }

    pub async fn find_items<C: ConnectionTrait>(
        db: &C,
        uuid: Uuid,
    ) -> Result<Vec<TransactionItem>, TransactionError> {
        let id = crate::models::ids::transaction_id_by_uuid(db, uuid)
            .await?
            .ok_or(TransactionError::NotFound)?;
        let records = transaction_item::Entity::find()
            .filter(transaction_item::Column::TransactionId.eq(id))
            .order_by_asc(transaction_item::Column::Id)
            .all(db)
            .await?;
        Ok(records
            .into_iter()
            .map(|model| TransactionItem {
                item_id: model.item_id,
                item_name: model.item_name,
                quantity: model.quantity,
                unit_price: model.unit_price,
                subtotal: model.subtotal,
                notes: model.notes,
            })
            .collect())
    }

    pub async fn count_by_number<C: ConnectionTrait>(
        db: &C,
        transaction_number: &str,
    ) -> Result<u64, DbErr> {
        use sea_orm::PaginatorTrait;
        transaction::Entity::find()
            .filter(transaction::Column::TransactionNumber.eq(transaction_number))
            .count(db)
            .await
    }
}
