//! WebAssembly module for the Stockroom inventory platform
//!
//! Provides client-side computation for:
//! - Stock level classification against a minimum threshold
//! - Output pre-checks before submitting a movement
//! - Offline validation of SKUs, warehouse codes and lot identifiers

use std::str::FromStr;

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::alerting::*;
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|_| format!("Invalid {}: {}", field, value))
}

fn classify(quantity: &str, threshold: &str) -> Result<StockLevel, String> {
    let quantity = parse_decimal("quantity", quantity)?;
    let threshold = parse_decimal("threshold", threshold)?;
    check_threshold(threshold).map_err(|e| e.to_string())?;
    Ok(evaluate_stock(quantity, threshold))
}

fn remaining_after_output(available: &str, requested: &str) -> Result<Decimal, String> {
    let available = parse_decimal("available", available)?;
    let requested = parse_decimal("requested", requested)?;
    apply_output(available, requested).map_err(|e| e.to_string())
}

/// Classify stock as `out_of_stock`, `low_stock` or `normal`
#[wasm_bindgen]
pub fn classify_stock(quantity: &str, threshold: &str) -> Result<String, JsValue> {
    classify(quantity, threshold)
        .map(|level| level.as_str().to_string())
        .map_err(|e| JsValue::from_str(&e))
}

/// Quantity left after an output, or an error when stock is insufficient
#[wasm_bindgen]
pub fn check_output(available: &str, requested: &str) -> Result<String, JsValue> {
    remaining_after_output(available, requested)
        .map(|remaining| remaining.normalize().to_string())
        .map_err(|e| JsValue::from_str(&e))
}

/// Level an output would leave the ledger row at
#[wasm_bindgen]
pub fn level_after_output(
    available: &str,
    requested: &str,
    threshold: &str,
) -> Result<String, JsValue> {
    remaining_after_output(available, requested)
        .and_then(|remaining| classify(&remaining.to_string(), threshold))
        .map(|level| level.as_str().to_string())
        .map_err(|e| JsValue::from_str(&e))
}

/// Normalize a lot identifier the way the server stores it
#[wasm_bindgen]
pub fn normalize_lot_code(lot: Option<String>) -> Result<String, JsValue> {
    normalize_lot(lot.as_deref()).map_err(JsValue::from_str)
}

/// Check SKU format
#[wasm_bindgen]
pub fn is_valid_sku(sku: &str) -> bool {
    validate_sku(sku).is_ok()
}

/// Check warehouse code format
#[wasm_bindgen]
pub fn is_valid_warehouse_code(code: &str) -> bool {
    validate_warehouse_code(code).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("0", "5"), Ok(StockLevel::OutOfStock));
        assert_eq!(classify("3", "5"), Ok(StockLevel::LowStock));
        assert_eq!(classify("5", "5"), Ok(StockLevel::Normal));
        assert!(classify("abc", "5").is_err());
        assert!(classify("5", "-1").is_err());
    }

    #[test]
    fn test_remaining_after_output() {
        assert_eq!(remaining_after_output("10", "4"), Ok(Decimal::from(6)));
        assert!(remaining_after_output("2", "3").is_err());
        assert!(remaining_after_output("2", "0").is_err());
    }

    #[test]
    fn test_format_checks() {
        assert!(is_valid_sku("WID-001"));
        assert!(!is_valid_sku("wid"));
        assert!(is_valid_warehouse_code("MAIN"));
        assert!(!is_valid_warehouse_code("M"));
    }
}
