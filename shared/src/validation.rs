//! Validation utilities for the Stockroom platform

use rust_decimal::Decimal;

use crate::types::DEFAULT_LOT;

/// Maximum length of free-text names
pub const MAX_NAME_LEN: usize = 120;

/// Maximum length of a lot identifier
pub const MAX_LOT_LEN: usize = 64;

// ============================================================================
// Catalog Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format");
    };
    if local.is_empty() || domain.starts_with('.') || domain.ends_with('.') {
        return Err("Invalid email format");
    }
    if domain.contains('.') && !email.contains(char::is_whitespace) && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate SKU format (3-32 uppercase alphanumeric or dash)
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.len() < 3 {
        return Err("SKU must be at least 3 characters");
    }
    if sku.len() > 32 {
        return Err("SKU must be at most 32 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("SKU must be uppercase alphanumeric or dash only");
    }
    Ok(())
}

/// Validate warehouse code format (2-10 uppercase alphanumeric)
pub fn validate_warehouse_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 2 || code.len() > 10 {
        return Err("Warehouse code must be 2 to 10 characters");
    }
    if !code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err("Warehouse code must be uppercase alphanumeric only");
    }
    Ok(())
}

/// Validate a display name
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name cannot be empty");
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err("Name is too long");
    }
    Ok(())
}

// ============================================================================
// Stock Validations
// ============================================================================

/// Validate a movement or order quantity
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Normalize an optional lot identifier, falling back to the default lot
pub fn normalize_lot(lot: Option<&str>) -> Result<String, &'static str> {
    match lot.map(str::trim) {
        None | Some("") => Ok(DEFAULT_LOT.to_string()),
        Some(lot) if lot.len() > MAX_LOT_LEN => Err("Lot identifier is too long"),
        Some(lot) => Ok(lot.to_uppercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("staff@example.com").is_ok());
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("missing-at.example.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@localhost").is_err());
        assert!(validate_email("user name@example.com").is_err());
        assert!(validate_email("user@.com").is_err());
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("WID-001").is_ok());
        assert!(validate_sku("AB").is_err());
        assert!(validate_sku("wid-001").is_err());
        assert!(validate_sku(&"A".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_warehouse_code() {
        assert!(validate_warehouse_code("MAIN").is_ok());
        assert!(validate_warehouse_code("W1").is_ok());
        assert!(validate_warehouse_code("W").is_err());
        assert!(validate_warehouse_code("MAIN-1").is_err());
    }

    #[test]
    fn test_normalize_lot() {
        assert_eq!(normalize_lot(None).unwrap(), DEFAULT_LOT);
        assert_eq!(normalize_lot(Some("  ")).unwrap(), DEFAULT_LOT);
        assert_eq!(normalize_lot(Some("lot-7")).unwrap(), "LOT-7");
        assert!(normalize_lot(Some(&"x".repeat(65))).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Widget").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"n".repeat(121)).is_err());
    }
}
