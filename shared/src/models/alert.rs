//! Stock alert models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of shortage an alert reports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "alert_classification", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AlertClassification {
    LowStock,
    OutOfStock,
}

impl AlertClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertClassification::LowStock => "low_stock",
            AlertClassification::OutOfStock => "out_of_stock",
        }
    }

    /// Human readable label used in alert messages and mail subjects
    pub fn label(&self) -> &'static str {
        match self {
            AlertClassification::LowStock => "Low stock",
            AlertClassification::OutOfStock => "Out of stock",
        }
    }
}

impl std::fmt::Display for AlertClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Alert lifecycle status
///
/// `new` alerts are unique per product. `active` means someone acknowledged
/// the alert, `order_sent` means a replenishment order was raised from it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "alert_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    New,
    Active,
    Resolved,
    OrderSent,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::New => "new",
            AlertStatus::Active => "active",
            AlertStatus::Resolved => "resolved",
            AlertStatus::OrderSent => "order_sent",
        }
    }

    /// Every status except `resolved`
    pub fn is_open(&self) -> bool {
        !matches!(self, AlertStatus::Resolved)
    }

    /// Check whether a status transition is valid
    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        use AlertStatus::*;
        matches!(
            (self, next),
            (New, Active)
                | (New, OrderSent)
                | (Active, OrderSent)
                | (OrderSent, Active)
                | (New, Resolved)
                | (Active, Resolved)
                | (OrderSent, Resolved)
        )
    }
}

/// Why an alert was resolved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "alert_resolution", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AlertResolution {
    /// Stock evaluated back to normal
    StockNormalized,
    /// Physical stock was received for the product
    Replenished,
    /// Closed by a user
    Manual,
}

impl AlertResolution {
    /// Note appended to the alert message on resolution
    pub fn note(&self) -> &'static str {
        match self {
            AlertResolution::StockNormalized => "Stock level back to normal",
            AlertResolution::Replenished => "Resolved by physical replenishment",
            AlertResolution::Manual => "Resolved manually",
        }
    }
}

/// A low or out of stock alert
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Alert {
    pub id: Uuid,
    pub product_id: Uuid,
    pub inventory_id: Uuid,
    pub classification: AlertClassification,
    pub status: AlertStatus,
    pub message: String,
    pub resolution: Option<AlertResolution>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_statuses() {
        assert!(AlertStatus::New.is_open());
        assert!(AlertStatus::Active.is_open());
        assert!(AlertStatus::OrderSent.is_open());
        assert!(!AlertStatus::Resolved.is_open());
    }

    #[test]
    fn test_resolved_is_terminal() {
        for next in [
            AlertStatus::New,
            AlertStatus::Active,
            AlertStatus::OrderSent,
            AlertStatus::Resolved,
        ] {
            assert!(!AlertStatus::Resolved.can_transition_to(next));
        }
    }

    #[test]
    fn test_acknowledge_only_from_new() {
        assert!(AlertStatus::New.can_transition_to(AlertStatus::Active));
        assert!(!AlertStatus::Active.can_transition_to(AlertStatus::New));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&AlertStatus::OrderSent).unwrap(),
            "\"order_sent\""
        );
        assert_eq!(
            serde_json::to_string(&AlertClassification::OutOfStock).unwrap(),
            "\"out_of_stock\""
        );
    }
}
