use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::payment, models::ids, types::PaymentStatus};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Payment not found")]
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Payment {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub method: String,
    pub amount: f64,
    pub change_amount: f64,
    pub reference_number: Option<String>,
    pub status: PaymentStatus,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub method: String,
    pub amount: f64,
    pub change_amount: f64,
    pub reference_number: Option<String>,
    pub status: PaymentStatus,
}

impl Payment {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: payment::Model,
    ) -> Result<Self, DbErr> {
        let transaction_id = ids::transaction_uuid_by_id(db, model.transaction_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Transaction not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            transaction_id,
            method: model.method,
            amount: model.amount,
            change_amount: model.change_amount,
            reference_number: model.reference_number,
            status: model.status,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_reference_and_method<C: ConnectionTrait>(
        db: &C,
        reference_number: &str,
        method: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = payment::Entity::find()
            .filter(payment::Column::ReferenceNumber.eq(reference_number))
            .filter(payment::Column::Method.eq(method))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_transaction<C: ConnectionTrait>(
        db: &C,
        transaction_uuid: Uuid,
    ) -> Result<Vec<Self>, PaymentError> {
        let transaction_id = ids::transaction_id_by_uuid(db, transaction_uuid)
            .await?
            .ok_or(PaymentError::NotFound)?;
        let records = payment::Entity::find()
            .filter(payment::Column::TransactionId.eq(transaction_id))
            .all(db)
            .await?;
        let mut payments = Vec::with_capacity(records.len());
        for model in records {
            payments.push(Self::from_model(db, model).await?);
        }
        Ok(payments)
    }

    pub async fn update_status<C: ConnectionTrait>(
        db: &C,
        uuid: Uuid,
        status: PaymentStatus,
    ) -> Result<Self, PaymentError> {
        let record = payment::Entity::find()
            .filter(payment::Column::Uuid.eq(uuid))
            .one(db)
            .await?
            .ok_or(PaymentError::NotFound)?;

        let mut active: payment::ActiveModel = record.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now().into());
        let model = active.update(db).await?;
        Ok(Self::from_model(db, model).await?)
    }
}

/// Used by transaction creation; payments never exist without a parent row.
pub(crate) async fn insert_for_transaction<C: ConnectionTrait>(
    db: &C,
    transaction_id: i64,
    data: &CreatePayment,
) -> Result<payment::Model, DbErr> {
    let now = Utc::now();
    let active = payment::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        transaction_id: Set(transaction_id),
        method: Set(data.method.clone()),
        amount: Set(data.amount),
        change_amount: Set(data.change_amount),
        reference_number: Set(data.reference_number.clone()),
        status: Set(data.status),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };
    active.insert(db).await
}
