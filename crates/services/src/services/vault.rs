//! Credentials-at-rest for integration secrets.
//!
//! Blob layout: `base64(salt || nonce || tag || ciphertext)` with an
//! AES-256-GCM key derived from the master key via PBKDF2-HMAC-SHA512.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use thiserror::Error;

const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const KEY_SIZE: usize = 32;
const PBKDF2_ITERATIONS: u32 = 100_000;

const ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";
const DEV_FALLBACK_KEY: &str = "default-key-change-in-production";

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Failed to encrypt credentials: {0}")]
    EncryptionFailed(String),
    #[error("Failed to decrypt credentials: {0}")]
    DecryptionFailed(String),
}

/// Encrypts and decrypts integration credential blobs with a single
/// process-wide master key.
#[derive(Clone)]
pub struct CredentialVault {
    master_key: String,
}

impl CredentialVault {
    pub fn new(master_key: impl Into<String>) -> Self {
        Self {
            master_key: master_key.into(),
        }
    }

    pub fn from_env() -> Self {
        match std::env::var(ENCRYPTION_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Self::new(key),
            _ => {
                tracing::warn!(
                    "{ENCRYPTION_KEY_ENV} is not set; using the development fallback key"
                );
                Self::new(DEV_FALLBACK_KEY)
            }
        }
    }

    fn derive_key(&self, salt: &[u8]) -> [u8; KEY_SIZE] {
        let mut key = [0u8; KEY_SIZE];
        pbkdf2::pbkdf2_hmac::<Sha512>(
            self.master_key.as_bytes(),
            salt,
            PBKDF2_ITERATIONS,
            &mut key,
        );
        key
    }

    /// Encrypt a credentials object to an opaque base64 blob for DB storage.
    pub fn encrypt_json(&self, value: &serde_json::Value) -> Result<String, VaultError> {
        let plaintext = serde_json::to_vec(value)
            .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

        use rand::RngCore;
        use rand::rngs::OsRng;
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let key = self.derive_key(&salt);
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        // aes-gcm appends the auth tag to the ciphertext; the stored layout
        // keeps the tag in front of the ciphertext instead.
        let mut sealed = cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;
        if sealed.len() < TAG_SIZE {
            return Err(VaultError::EncryptionFailed(
                "Ciphertext shorter than auth tag".to_string(),
            ));
        }
        let tag = sealed.split_off(sealed.len() - TAG_SIZE);

        let mut blob = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + TAG_SIZE + sealed.len());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&tag);
        blob.extend_from_slice(&sealed);

        Ok(BASE64.encode(&blob))
    }

    /// Decrypt a stored blob back to the credentials object. A blob whose
    /// plaintext is not JSON decrypts to a JSON string value.
    pub fn decrypt_json(&self, encoded: &str) -> Result<serde_json::Value, VaultError> {
        let blob = BASE64
            .decode(encoded)
            .map_err(|e| VaultError::DecryptionFailed(format!("Base64 decode failed: {e}")))?;

        if blob.len() < SALT_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(VaultError::DecryptionFailed(
                "Invalid encrypted data format".to_string(),
            ));
        }

        let (salt, rest) = blob.split_at(SALT_SIZE);
        let (nonce_bytes, rest) = rest.split_at(NONCE_SIZE);
        let (tag, ciphertext) = rest.split_at(TAG_SIZE);

        let key = self.derive_key(salt);
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| VaultError::DecryptionFailed(e.to_string()))?;
        let nonce = Nonce::from_slice(nonce_bytes);

        let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);

        let plaintext = cipher
            .decrypt(nonce, sealed.as_slice())
            .map_err(|e| VaultError::DecryptionFailed(e.to_string()))?;

        match serde_json::from_slice(&plaintext) {
            Ok(value) => Ok(value),
            Err(_) => {
                let text = String::from_utf8(plaintext)
                    .map_err(|e| VaultError::DecryptionFailed(e.to_string()))?;
                Ok(serde_json::Value::String(text))
            }
        }
    }
}

/// The fields the webhook verifier cares about inside a decrypted
/// credentials object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookCredentials {
    pub webhook_secret: Option<String>,
    pub api_key: Option<String>,
}

impl WebhookCredentials {
    pub fn from_value(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    /// The HMAC key: `webhookSecret`, falling back to `apiKey`.
    pub fn signing_secret(&self) -> Option<&str> {
        self.webhook_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.api_key.as_deref().filter(|s| !s.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> CredentialVault {
        CredentialVault::new("test-master-key")
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let credentials = serde_json::json!({
            "webhookSecret": "whsec_123",
            "apiKey": "key_456",
        });

        let blob = vault().encrypt_json(&credentials).expect("encryption failed");
        let restored = vault().decrypt_json(&blob).expect("decryption failed");
        assert_eq!(restored, credentials);
    }

    #[test]
    fn different_encryptions_produce_different_blobs() {
        let credentials = serde_json::json!({"webhookSecret": "same"});
        let blob1 = vault().encrypt_json(&credentials).unwrap();
        let blob2 = vault().encrypt_json(&credentials).unwrap();

        // Random salt and nonce make blobs differ even for equal plaintext.
        assert_ne!(blob1, blob2);
        assert_eq!(
            vault().decrypt_json(&blob1).unwrap(),
            vault().decrypt_json(&blob2).unwrap()
        );
    }

    #[test]
    fn decrypt_with_wrong_master_key_fails() {
        let blob = vault()
            .encrypt_json(&serde_json::json!({"webhookSecret": "s"}))
            .unwrap();
        let other = CredentialVault::new("another-master-key");
        assert!(other.decrypt_json(&blob).is_err());
    }

    #[test]
    fn tampered_blob_is_rejected() {
        let blob = vault()
            .encrypt_json(&serde_json::json!({"webhookSecret": "s"}))
            .unwrap();
        let mut raw = BASE64.decode(&blob).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = BASE64.encode(&raw);
        assert!(vault().decrypt_json(&tampered).is_err());
    }

    #[test]
    fn decrypt_rejects_garbage_input() {
        assert!(vault().decrypt_json("not-valid-base64!!!").is_err());
        assert!(vault().decrypt_json(&BASE64.encode([0u8; 8])).is_err());
    }

    #[test]
    fn signing_secret_prefers_webhook_secret() {
        let credentials = WebhookCredentials {
            webhook_secret: Some("secret".to_string()),
            api_key: Some("key".to_string()),
        };
        assert_eq!(credentials.signing_secret(), Some("secret"));
    }

    #[test]
    fn signing_secret_falls_back_to_api_key() {
        let credentials = WebhookCredentials {
            webhook_secret: None,
            api_key: Some("key".to_string()),
        };
        assert_eq!(credentials.signing_secret(), Some("key"));

        let empty_secret = WebhookCredentials {
            webhook_secret: Some(String::new()),
            api_key: Some("key".to_string()),
        };
        assert_eq!(empty_secret.signing_secret(), Some("key"));
    }

    #[test]
    fn signing_secret_absent_when_neither_configured() {
        assert_eq!(WebhookCredentials::default().signing_secret(), None);
    }

    #[test]
    fn from_value_tolerates_foreign_shapes() {
        let credentials = WebhookCredentials::from_value(&serde_json::json!("just a string"));
        assert!(credentials.webhook_secret.is_none());
        assert!(credentials.api_key.is_none());
    }
}
