//! Inbound webhook pipeline.
//!
//! Stage order is load-bearing: rate limiter → idempotency lookup →
//! signature verification → reconciliation → idempotency store. Any stage
//! failure returns immediately; later stages never run. Cached hits replay
//! the first delivery's envelope verbatim, bypassing verification and
//! reconciliation entirely.

use std::{net::SocketAddr, str::FromStr};

use axum::{
    Router,
    body::Bytes,
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
    response::Json as ResponseJson,
    routing::post,
};
use db::types::{IntegrationPlatform, PaymentStatus};
use serde::Serialize;
use serde_json::Value;
use services::services::{
    payload::{self, OrderWebhook, PaymentWebhook},
    reconcile::{self, ReconciliationOutcome},
    verify,
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
struct OrderCreatedData {
    transaction_id: Uuid,
    transaction_number: String,
    total: f64,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
struct OrderUpdatedData {
    transaction_id: Uuid,
    status: String,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
struct PaymentSettledData {
    transaction_id: Uuid,
    status: PaymentStatus,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/{platform}", post(handle_webhook))
}

async fn handle_webhook(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ResponseJson<Value>, ApiError> {
    let platform = IntegrationPlatform::from_str(&platform.to_lowercase())
        .map_err(|_| ApiError::NotFound(format!("Unknown webhook platform: {platform}")))?;

    if !state.rate_limiter().check(platform, addr.ip()) {
        return Err(ApiError::RateLimitExceeded);
    }

    let raw_payload: Value = serde_json::from_slice(&body)
        .map_err(|err| ApiError::InvalidPayload(format!("Invalid JSON body: {err}")))?;

    // Payloads without a qualifying identifier cannot be deduplicated; the
    // pipeline just runs uncached for those.
    let idempotency_key = payload::idempotency_key(platform, &raw_payload);
    if let Some(key) = idempotency_key.as_deref()
        && let Some(cached) = state.idempotency().lookup(key)
    {
        tracing::debug!(%platform, key, "Replaying cached webhook response");
        return Ok(ResponseJson(cached));
    }

    let header_name = verify::signature_header(platform);
    let provided_signature = headers
        .get(header_name.as_str())
        .and_then(|value| value.to_str().ok());
    let verified = verify::verify_signature(
        &state.db().pool,
        state.vault(),
        platform,
        &body,
        provided_signature,
    )
    .await?;

    let envelope = if platform.is_payment_platform() {
        let webhook: PaymentWebhook = serde_json::from_value(raw_payload)
            .map_err(|err| ApiError::InvalidPayload(err.to_string()))?;
        let outcome = reconcile::settle_qris_payment(&state.db().pool, &webhook).await?;
        let ReconciliationOutcome::PaymentSettled {
            transaction_id,
            status,
        } = outcome
        else {
            return Err(ApiError::Internal(
                "Unexpected outcome for payment webhook".to_string(),
            ));
        };
        build_envelope(
            format!("{} webhook processed successfully", platform.display_name()),
            PaymentSettledData {
                transaction_id,
                status,
            },
        )?
    } else {
        let webhook: OrderWebhook = serde_json::from_value(raw_payload)
            .map_err(|err| ApiError::InvalidPayload(err.to_string()))?;
        let outcome =
            reconcile::reconcile_order(&state.db().pool, platform, &verified, &webhook).await?;
        match outcome {
            ReconciliationOutcome::Created {
                transaction_id,
                transaction_number,
                total,
            } => build_envelope(
                format!("{} order created successfully", platform.display_name()),
                OrderCreatedData {
                    transaction_id,
                    transaction_number,
                    total,
                },
            )?,
            ReconciliationOutcome::Updated {
                transaction_id,
                status,
            } => build_envelope(
                format!("{} order status updated", platform.display_name()),
                OrderUpdatedData {
                    transaction_id,
                    status,
                },
            )?,
            ReconciliationOutcome::PaymentSettled { .. } => {
                return Err(ApiError::Internal(
                    "Unexpected outcome for order webhook".to_string(),
                ));
            }
        }
    };

    // Failures above never reach this point, so only successes are
    // replayable.
    if let Some(key) = idempotency_key {
        state.idempotency().store(key, envelope.clone());
    }

    Ok(ResponseJson(envelope))
}

fn build_envelope<T: Serialize>(message: String, data: T) -> Result<Value, ApiError> {
    let data = serde_json::to_value(data)
        .map_err(|err| ApiError::Internal(format!("Failed to serialize response: {err}")))?;
    ApiResponse::success_with_message(message, data)
        .to_value()
        .map_err(|err| ApiError::Internal(format!("Failed to serialize response: {err}")))
}
