//! Typed webhook payloads with the documented defaulting rules.
//!
//! Delivery platforms send whatever their integration teams shipped that
//! quarter; every numeric field here tolerates numbers, numeric strings, and
//! absence. A malformed optional field degrades to its default instead of
//! failing the request.

use db::types::IntegrationPlatform;
use serde::Deserialize;
use serde_json::Value;
use ts_rs::TS;

/// Status placeholder used in idempotency keys when the payload omits one.
const STATUS_PLACEHOLDER: &str = "unknown";

/// Order-lifecycle webhook from a delivery platform.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct OrderWebhook {
    #[ts(type = "string | number | null")]
    pub order_id: Option<Value>,
    pub status: Option<String>,
    pub items: Option<Vec<OrderItem>>,
    pub customer: Option<OrderCustomer>,
    #[ts(type = "string | number | null")]
    pub total_amount: Option<Value>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub sku: Option<String>,
    pub name: Option<String>,
    #[ts(type = "string | number | null")]
    pub quantity: Option<Value>,
    #[ts(type = "string | number | null")]
    pub price: Option<Value>,
    #[ts(type = "string | number | null")]
    pub unit_price: Option<Value>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Payment-settlement webhook (QRIS).
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PaymentWebhook {
    #[ts(type = "string | number | null")]
    pub transaction_id: Option<Value>,
    pub status: Option<String>,
    #[ts(type = "string | number | null")]
    pub amount: Option<Value>,
    #[ts(type = "string | number | null")]
    pub reference_number: Option<Value>,
}

impl OrderWebhook {
    pub fn order_id(&self) -> Option<String> {
        external_id(self.order_id.as_ref())
    }

    pub fn total_amount(&self) -> f64 {
        lenient_f64(self.total_amount.as_ref(), 0.0)
    }
}

impl OrderItem {
    pub fn quantity(&self) -> f64 {
        lenient_f64(self.quantity.as_ref(), 1.0)
    }

    /// `price` wins over `unitPrice`; both missing or malformed means 0.
    pub fn unit_price(&self) -> f64 {
        match self.price.as_ref() {
            Some(value) if !value.is_null() => lenient_f64(Some(value), 0.0),
            _ => lenient_f64(self.unit_price.as_ref(), 0.0),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("Unknown Item")
    }
}

impl PaymentWebhook {
    pub fn reference_number(&self) -> Option<String> {
        external_id(self.reference_number.as_ref())
    }

    pub fn succeeded(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

/// Lenient float parsing: numbers and numeric strings pass, everything else
/// (null, empty, garbage) resolves to the default. Never errors.
pub fn lenient_f64(value: Option<&Value>, default: f64) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return default;
            }
            trimmed.parse::<f64>().unwrap_or(default)
        }
        _ => default,
    }
}

/// External identifiers arrive as strings or bare numbers.
fn external_id(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Derive the dedup key for a raw payload: platform, the first qualifying
/// external identifier, and the reported status. Payloads with no identifier
/// cannot be deduplicated and return `None`; the pipeline then runs
/// uncached.
pub fn idempotency_key(platform: IntegrationPlatform, payload: &Value) -> Option<String> {
    let id = ["orderId", "transactionId", "referenceNumber"]
        .iter()
        .find_map(|field| external_id(payload.get(*field)))?;
    let status = payload
        .get("status")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(STATUS_PLACEHOLDER);
    Some(format!("{platform}:{id}:{status}"))
}
