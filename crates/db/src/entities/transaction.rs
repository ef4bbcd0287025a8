use sea_orm::entity::prelude::*;

use crate::types::OrderType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub transaction_number: String,
    pub order_type: OrderType,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax_amount: f64,
    pub service_charge: f64,
    pub total: f64,
    // Free text: unrecognized external statuses pass through verbatim.
    pub status: String,
    pub outlet_id: i64,
    pub notes: Option<String>,
    pub completed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
