//! Owner-facing management of integration configurations.
//!
//! Tenant identity is supplied by the upstream auth layer as a trusted
//! `x-tenant-id` header; this surface never derives it from the payload.

use std::{collections::HashMap, str::FromStr};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    response::Json as ResponseJson,
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use db::{
    models::integration::{Integration, UpsertIntegration},
    types::{IntegrationPlatform, IntegrationStatus},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

const TENANT_ID_HEADER: &str = "x-tenant-id";

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub integration_type: IntegrationPlatform,
    pub status: IntegrationStatus,
    pub is_active: bool,
    pub configuration: Value,
    /// Decrypted for the owner; never exposed on webhook surfaces.
    pub credentials: Value,
    pub metadata: Value,
    #[ts(type = "Date | null")]
    pub activated_at: Option<DateTime<Utc>>,
    #[ts(type = "Date | null")]
    pub last_sync_at: Option<DateTime<Utc>>,
    #[ts(type = "Date | null")]
    pub created_at: Option<DateTime<Utc>>,
    #[ts(type = "Date | null")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIntegrationRequest {
    pub status: Option<IntegrationStatus>,
    pub is_active: Option<bool>,
    pub configuration: Option<Value>,
    /// Plaintext credentials object; encrypted before it touches storage.
    pub credentials: Option<Value>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/integrations", get(get_integrations))
        .route("/integrations/{platform}", put(update_integration))
}

fn tenant_id(headers: &HeaderMap) -> Result<i64, ApiError> {
    headers
        .get(TENANT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or(ApiError::MissingTenant)
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

fn default_view(platform: IntegrationPlatform) -> IntegrationView {
    IntegrationView {
        id: None,
        integration_type: platform,
        status: IntegrationStatus::Inactive,
        is_active: false,
        configuration: empty_object(),
        credentials: empty_object(),
        metadata: empty_object(),
        activated_at: None,
        last_sync_at: None,
        created_at: None,
        updated_at: None,
    }
}

fn view_with_credentials(integration: Integration, credentials: Value) -> IntegrationView {
    IntegrationView {
        id: Some(integration.id),
        integration_type: integration.platform,
        status: integration.status,
        is_active: integration.is_active,
        configuration: integration.configuration,
        credentials,
        metadata: integration.metadata,
        activated_at: integration.activated_at,
        last_sync_at: integration.last_sync_at,
        created_at: Some(integration.created_at),
        updated_at: Some(integration.updated_at),
    }
}

fn decrypt_view(state: &AppState, integration: Integration) -> Result<IntegrationView, ApiError> {
    let credentials = match integration.credentials.as_deref() {
        Some(blob) => state.vault().decrypt_json(blob)?,
        None => empty_object(),
    };
    Ok(view_with_credentials(integration, credentials))
}

/// All four platforms, with defaults merged in for the ones this tenant has
/// never configured.
pub async fn get_integrations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<ResponseJson<ApiResponse<Vec<IntegrationView>>>, ApiError> {
    let tenant_id = tenant_id(&headers)?;

    let mut existing: HashMap<IntegrationPlatform, Integration> =
        Integration::find_all_by_tenant(&state.db().pool, tenant_id)
            .await?
            .into_iter()
            .map(|integration| (integration.platform, integration))
            .collect();

    let mut views = Vec::with_capacity(IntegrationPlatform::ALL.len());
    for platform in IntegrationPlatform::ALL {
        match existing.remove(&platform) {
            Some(integration) => views.push(decrypt_view(&state, integration)?),
            None => views.push(default_view(platform)),
        }
    }

    Ok(ResponseJson(ApiResponse::success(views)))
}

pub async fn update_integration(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateIntegrationRequest>,
) -> Result<ResponseJson<ApiResponse<IntegrationView>>, ApiError> {
    let tenant_id = tenant_id(&headers)?;
    let platform = IntegrationPlatform::from_str(&platform.to_lowercase())
        .map_err(|_| ApiError::NotFound(format!("Unknown integration platform: {platform}")))?;

    let credentials_blob = payload
        .credentials
        .as_ref()
        .map(|value| state.vault().encrypt_json(value))
        .transpose()?;

    let integration = Integration::upsert(
        &state.db().pool,
        tenant_id,
        platform,
        &UpsertIntegration {
            status: payload.status,
            is_active: payload.is_active,
            configuration: payload.configuration.clone(),
            credentials: credentials_blob,
        },
    )
    .await?;

    tracing::info!(
        tenant_id,
        %platform,
        is_active = integration.is_active,
        "Integration configuration saved"
    );

    let credentials = payload.credentials.unwrap_or_else(empty_object);
    Ok(ResponseJson(ApiResponse::success_with_message(
        format!("{platform} integration updated successfully"),
        view_with_credentials(integration, credentials),
    )))
}
