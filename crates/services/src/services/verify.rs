//! Webhook authentication.
//!
//! Delivery platforms carry no tenant token, so the active integration row
//! for the platform doubles as the tenant-resolution mechanism: whoever
//! configured the matching secret is the tenant the order belongs to.

use db::{ConnectionTrait, DbErr, models::integration::Integration, types::IntegrationPlatform};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::services::vault::{CredentialVault, VaultError, WebhookCredentials};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum WebhookAuthError {
    #[error("Webhook signature is required")]
    MissingSignature,
    #[error("{} integration not configured", .0.display_name())]
    IntegrationNotConfigured(IntegrationPlatform),
    #[error("Webhook secret not configured")]
    SecretMissing,
    #[error("Invalid webhook signature")]
    InvalidSignature,
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Context attached to a request once its signature checks out.
#[derive(Debug, Clone)]
pub struct VerifiedWebhook {
    pub integration_id: Uuid,
    pub tenant_id: i64,
    pub outlet_id: Option<i64>,
    pub platform: IntegrationPlatform,
}

/// Header carrying the hex HMAC, e.g. `x-gofood-signature`.
pub fn signature_header(platform: IntegrationPlatform) -> String {
    format!("x-{platform}-signature")
}

/// Hex-encoded HMAC-SHA256 of the raw request body.
pub fn compute_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison; a length mismatch is a mismatch, never a panic.
fn signatures_match(expected: &str, provided: &str) -> bool {
    use subtle::ConstantTimeEq;
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

pub async fn verify_signature<C: ConnectionTrait>(
    db: &C,
    vault: &CredentialVault,
    platform: IntegrationPlatform,
    raw_body: &[u8],
    provided_signature: Option<&str>,
) -> Result<VerifiedWebhook, WebhookAuthError> {
    let provided = provided_signature
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(WebhookAuthError::MissingSignature)?;

    let integration = Integration::find_active_by_platform(db, platform)
        .await?
        .ok_or(WebhookAuthError::IntegrationNotConfigured(platform))?;

    let credentials = match integration.credentials.as_deref() {
        Some(blob) => WebhookCredentials::from_value(&vault.decrypt_json(blob)?),
        None => WebhookCredentials::default(),
    };
    let secret = credentials
        .signing_secret()
        .ok_or(WebhookAuthError::SecretMissing)?;

    let expected = compute_signature(secret, raw_body);
    if !signatures_match(&expected, provided) {
        tracing::warn!(%platform, "Webhook signature mismatch");
        return Err(WebhookAuthError::InvalidSignature);
    }

    Ok(VerifiedWebhook {
        integration_id: integration.id,
        tenant_id: integration.tenant_id,
        outlet_id: integration.configured_outlet_id(),
        platform,
    })
}
