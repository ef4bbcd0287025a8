use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// Third-party platforms that deliver webhooks into the pipeline.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IntegrationPlatform {
    #[sea_orm(string_value = "qris")]
    Qris,
    #[sea_orm(string_value = "gofood")]
    Gofood,
    #[sea_orm(string_value = "grabfood")]
    Grabfood,
    #[sea_orm(string_value = "shopeefood")]
    Shopeefood,
}

impl IntegrationPlatform {
    pub const ALL: [IntegrationPlatform; 4] = [
        IntegrationPlatform::Qris,
        IntegrationPlatform::Gofood,
        IntegrationPlatform::Grabfood,
        IntegrationPlatform::Shopeefood,
    ];

    /// Brand casing for human-facing messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            IntegrationPlatform::Qris => "QRIS",
            IntegrationPlatform::Gofood => "GoFood",
            IntegrationPlatform::Grabfood => "GrabFood",
            IntegrationPlatform::Shopeefood => "ShopeeFood",
        }
    }

    /// QRIS sends payment-settlement webhooks; the rest send order-lifecycle
    /// webhooks.
    pub fn is_payment_platform(&self) -> bool {
        matches!(self, IntegrationPlatform::Qris)
    }
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IntegrationStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[default]
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "pending")]
    Pending,
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderType {
    #[sea_orm(string_value = "dine_in")]
    #[strum(serialize = "dine_in")]
    #[serde(rename = "dine_in")]
    DineIn,
    #[sea_orm(string_value = "takeaway")]
    Takeaway,
    #[sea_orm(string_value = "delivery")]
    Delivery,
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Known transaction lifecycle states.
///
/// The `transactions.status` column itself is free text: unrecognized
/// external statuses are stored verbatim rather than rejected, so this enum
/// only covers the states the platform maps onto.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Ready,
    Delivering,
    Completed,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn platform_parses_from_path_segment() {
        assert_eq!(
            IntegrationPlatform::from_str("gofood").unwrap(),
            IntegrationPlatform::Gofood
        );
        assert!(IntegrationPlatform::from_str("dana").is_err());
    }

    #[test]
    fn platform_display_is_lowercase() {
        assert_eq!(IntegrationPlatform::Shopeefood.to_string(), "shopeefood");
        assert_eq!(IntegrationPlatform::Shopeefood.display_name(), "ShopeeFood");
    }

    #[test]
    fn only_qris_is_a_payment_platform() {
        assert!(IntegrationPlatform::Qris.is_payment_platform());
        assert!(!IntegrationPlatform::Gofood.is_payment_platform());
        assert!(!IntegrationPlatform::Grabfood.is_payment_platform());
        assert!(!IntegrationPlatform::Shopeefood.is_payment_platform());
    }

    #[test]
    fn transaction_status_roundtrips_as_lowercase() {
        assert_eq!(TransactionStatus::Delivering.to_string(), "delivering");
        assert_eq!(
            TransactionStatus::from_str("completed").unwrap(),
            TransactionStatus::Completed
        );
    }
}
