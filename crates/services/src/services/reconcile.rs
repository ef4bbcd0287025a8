//! Reconciliation of external order/payment events into transaction records.

use db::{
    DatabaseConnection, DbErr, TransactionTrait,
    models::{
        item::CatalogItem,
        payment::{CreatePayment, Payment, PaymentError},
        transaction::{
            CreateTransaction, CreateTransactionItem, Transaction, TransactionError,
        },
    },
    types::{IntegrationPlatform, OrderType, PaymentStatus, TransactionStatus},
};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::services::{
    payload::{OrderWebhook, PaymentWebhook},
    verify::VerifiedWebhook,
};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{} integration outlet not configured", .0.display_name())]
    OutletNotConfigured(IntegrationPlatform),
    #[error("Order id is required")]
    MissingOrderId,
    #[error("Payment reference number is required")]
    MissingReference,
    #[error("Payment not found")]
    PaymentNotFound,
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// What a successfully processed webhook did.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ReconciliationOutcome {
    Created {
        transaction_id: Uuid,
        transaction_number: String,
        total: f64,
    },
    Updated {
        transaction_id: Uuid,
        status: String,
    },
    PaymentSettled {
        transaction_id: Uuid,
        status: PaymentStatus,
    },
}

/// Map a delivery platform's order status onto the internal lifecycle.
/// Unrecognized statuses pass through unchanged; external platforms add
/// states without telling anyone.
pub fn map_delivery_status(raw: &str) -> String {
    let mapped = match raw.to_lowercase().as_str() {
        "new" => TransactionStatus::Pending,
        "accepted" | "preparing" => TransactionStatus::Processing,
        "ready" => TransactionStatus::Ready,
        "picked_up" => TransactionStatus::Delivering,
        "delivered" => TransactionStatus::Completed,
        "cancelled" | "rejected" => TransactionStatus::Cancelled,
        _ => return raw.to_string(),
    };
    mapped.to_string()
}

/// Deterministic transaction number for an external order; redelivered
/// creations collapse onto the same number.
pub fn transaction_number(platform: IntegrationPlatform, order_id: &str) -> String {
    format!("{}-{}", platform.to_string().to_uppercase(), order_id)
}

pub async fn reconcile_order(
    db: &DatabaseConnection,
    platform: IntegrationPlatform,
    verified: &VerifiedWebhook,
    payload: &OrderWebhook,
) -> Result<ReconciliationOutcome, ReconcileError> {
    let order_id = payload.order_id().ok_or(ReconcileError::MissingOrderId)?;
    let number = transaction_number(platform, &order_id);

    if let Some(existing) = Transaction::find_by_number(db, &number).await? {
        return apply_status_update(db, existing, payload.status.as_deref()).await;
    }

    let outlet_id = verified
        .outlet_id
        .ok_or(ReconcileError::OutletNotConfigured(platform))?;

    let mut items = Vec::new();
    let mut items_subtotal = 0.0;
    for line in payload.items.iter().flatten() {
        let quantity = line.quantity();
        let unit_price = line.unit_price();
        let line_subtotal = quantity * unit_price;
        items_subtotal += line_subtotal;

        // Best effort: external catalogs rarely align with ours, so an
        // unmatched line keeps the external name and no catalog reference.
        let matched =
            CatalogItem::find_outlet_match(db, outlet_id, line.sku.as_deref(), line.name.as_deref())
                .await?;

        items.push(CreateTransactionItem {
            item_id: matched.map(|item| item.id),
            item_name: line.display_name().to_string(),
            quantity,
            unit_price,
            subtotal: line_subtotal,
            notes: line.notes.clone(),
        });
    }

    let subtotal = if items.is_empty() {
        payload.total_amount()
    } else {
        items_subtotal
    };

    let status = map_delivery_status(payload.status.as_deref().unwrap_or("new"));
    let platform_upper = platform.to_string().to_uppercase();
    let customer_name = payload
        .customer
        .as_ref()
        .and_then(|c| c.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("{platform} Customer"));

    let data = CreateTransaction {
        transaction_number: number.clone(),
        order_type: OrderType::Delivery,
        customer_name,
        customer_phone: payload.customer.as_ref().and_then(|c| c.phone.clone()),
        subtotal,
        status,
        outlet_id,
        notes: Some(format!(
            "{platform_upper} Order - {}",
            payload.notes.as_deref().unwrap_or_default()
        )),
        items,
        payment: CreatePayment {
            method: platform.to_string(),
            amount: subtotal,
            change_amount: 0.0,
            reference_number: Some(order_id.clone()),
            status: PaymentStatus::Completed,
        },
    };

    let created = {
        let txn = db.begin().await?;
        match Transaction::create_with_children(&txn, &data).await {
            Ok(transaction) => {
                txn.commit().await?;
                Ok(transaction)
            }
            Err(err) => {
                // Rolled back on drop.
                Err(err)
            }
        }
    };

    match created {
        Ok(transaction) => {
            tracing::info!(
                transaction_id = %transaction.id,
                transaction_number = %number,
                %platform,
                total = transaction.total,
                "Created transaction from webhook"
            );
            Ok(ReconciliationOutcome::Created {
                transaction_id: transaction.id,
                transaction_number: transaction.transaction_number,
                total: transaction.total,
            })
        }
        Err(err) if db::is_unique_violation(&err) => {
            // A concurrent delivery of the same order won the insert; this
            // request degrades to the status-update path against the winner.
            tracing::warn!(
                transaction_number = %number,
                %platform,
                "Concurrent creation detected; applying as status update"
            );
            let existing = Transaction::find_by_number(db, &number)
                .await?
                .ok_or(TransactionError::NotFound)?;
            apply_status_update(db, existing, payload.status.as_deref()).await
        }
        Err(err) => Err(err.into()),
    }
}

async fn apply_status_update(
    db: &DatabaseConnection,
    existing: Transaction,
    raw_status: Option<&str>,
) -> Result<ReconciliationOutcome, ReconcileError> {
    // No status in the payload: nothing to advance.
    let Some(raw) = raw_status.filter(|s| !s.trim().is_empty()) else {
        return Ok(ReconciliationOutcome::Updated {
            transaction_id: existing.id,
            status: existing.status,
        });
    };

    let mapped = map_delivery_status(raw);
    let completed = mapped == TransactionStatus::Completed.to_string();
    let updated = Transaction::update_status(db, existing.id, &mapped, completed).await?;

    Ok(ReconciliationOutcome::Updated {
        transaction_id: updated.id,
        status: updated.status,
    })
}

/// QRIS sends payment settlements, not order lifecycles: find the pending
/// payment by its reference, settle it, and complete the parent transaction
/// on success. No item reconciliation happens here.
pub async fn settle_qris_payment(
    db: &DatabaseConnection,
    payload: &PaymentWebhook,
) -> Result<ReconciliationOutcome, ReconcileError> {
    let reference = payload
        .reference_number()
        .ok_or(ReconcileError::MissingReference)?;

    let payment = Payment::find_by_reference_and_method(db, &reference, "qris")
        .await?
        .ok_or(ReconcileError::PaymentNotFound)?;

    let status = if payload.succeeded() {
        PaymentStatus::Completed
    } else {
        PaymentStatus::Failed
    };

    let txn = db.begin().await?;
    Payment::update_status(&txn, payment.id, status).await?;
    if payload.succeeded() {
        Transaction::update_status(
            &txn,
            payment.transaction_id,
            &TransactionStatus::Completed.to_string(),
            true,
        )
        .await?;
    }
    txn.commit().await?;

    tracing::info!(
        payment_id = %payment.id,
        transaction_id = %payment.transaction_id,
        reference_number = %reference,
        %status,
        "Settled QRIS payment"
    );

    Ok(ReconciliationOutcome::PaymentSettled {
        transaction_id: payment.transaction_id,
        status,
    })
}
