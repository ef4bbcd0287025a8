use serde::{Deserialize, Serialize, de::DeserializeOwned};
use ts_rs::TS;

/// Standard response envelope for every API endpoint.
///
/// Webhook callers additionally rely on `error_code` being a stable,
/// machine-readable discriminator (e.g. `INVALID_SIGNATURE`), while `message`
/// stays human-readable.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error_code: None,
        }
    }

    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            error_code: None,
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            message: Some(message.to_string()),
            data: None,
            error_code: None,
        }
    }

    pub fn error_with_code(code: &str, message: &str) -> Self {
        Self {
            success: false,
            message: Some(message.to_string()),
            data: None,
            error_code: Some(code.to_string()),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Serialize the envelope for storage (idempotent replay keeps the exact
    /// bytes a caller saw on first delivery).
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl<T: DeserializeOwned> ApiResponse<T> {
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
