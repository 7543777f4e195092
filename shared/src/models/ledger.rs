//! Stock ledger models and movement arithmetic

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::alerting::{evaluate_stock, StockLevel};

/// Current stock of one product lot in one warehouse
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockLedgerEntry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub lot: String,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    pub min_stock: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockLedgerEntry {
    /// Evaluate this row against its own minimum threshold
    pub fn stock_level(&self) -> StockLevel {
        evaluate_stock(self.quantity, self.min_stock)
    }
}

/// Inbound stock movement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockEntry {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub product_id: Uuid,
    pub lot: String,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    pub supplier_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub unit_cost: Option<Decimal>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Outbound stock movement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockOutput {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub product_id: Uuid,
    pub lot: String,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    pub reason: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Business-rule failures of ledger arithmetic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("Quantity must be greater than zero")]
    NonPositiveQuantity,

    #[error("Minimum stock cannot be negative")]
    NegativeThreshold,

    #[error("Insufficient stock: requested {requested}, available {available}")]
    Insufficient {
        requested: Decimal,
        available: Decimal,
    },
}

/// Quantity after receiving `quantity` units
pub fn apply_entry(current: Decimal, quantity: Decimal) -> Result<Decimal, StockError> {
    if quantity <= Decimal::ZERO {
        return Err(StockError::NonPositiveQuantity);
    }
    Ok(current + quantity)
}

/// Quantity after issuing `quantity` units; never goes below zero
pub fn apply_output(current: Decimal, quantity: Decimal) -> Result<Decimal, StockError> {
    if quantity <= Decimal::ZERO {
        return Err(StockError::NonPositiveQuantity);
    }
    if quantity > current {
        return Err(StockError::Insufficient {
            requested: quantity,
            available: current,
        });
    }
    Ok(current - quantity)
}

/// Check a minimum threshold value
pub fn check_threshold(min_stock: Decimal) -> Result<Decimal, StockError> {
    if min_stock < Decimal::ZERO {
        return Err(StockError::NegativeThreshold);
    }
    Ok(min_stock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_entry_increments() {
        assert_eq!(apply_entry(dec("3"), dec("2.5")), Ok(dec("5.5")));
        assert_eq!(
            apply_entry(dec("3"), Decimal::ZERO),
            Err(StockError::NonPositiveQuantity)
        );
    }

    #[test]
    fn test_output_rejects_overdraw() {
        assert_eq!(apply_output(dec("10"), dec("10")), Ok(Decimal::ZERO));
        assert_eq!(
            apply_output(dec("4"), dec("5")),
            Err(StockError::Insufficient {
                requested: dec("5"),
                available: dec("4"),
            })
        );
        assert_eq!(
            apply_output(dec("4"), dec("-1")),
            Err(StockError::NonPositiveQuantity)
        );
    }

    #[test]
    fn test_threshold_check() {
        assert!(check_threshold(Decimal::ZERO).is_ok());
        assert_eq!(check_threshold(dec("-1")), Err(StockError::NegativeThreshold));
    }
}
