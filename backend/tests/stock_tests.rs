//! Stock ledger tests
//!
//! Tests for ledger bookkeeping including:
//! - Entry and output arithmetic
//! - Lot normalization and catalog code validation
//! - Order and alert lifecycle transitions
//! - Pagination bounds for list endpoints

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    apply_entry, apply_output, check_threshold, normalize_lot, validate_sku,
    validate_warehouse_code, AlertStatus, OrderStatus, Pagination, PaginationMeta, StockError,
    DEFAULT_LOT, MAX_PER_PAGE,
};
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Fractional quantities keep their precision
    #[test]
    fn test_fractional_movements() {
        let after_entry = apply_entry(dec("1.250"), dec("0.750")).unwrap();
        assert_eq!(after_entry, dec("2"));

        let after_output = apply_output(after_entry, dec("0.125")).unwrap();
        assert_eq!(after_output, dec("1.875"));
    }

    /// Taking everything leaves exactly zero
    #[test]
    fn test_output_can_empty_row() {
        assert_eq!(apply_output(dec("7"), dec("7")), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_non_positive_quantities_rejected() {
        assert_eq!(
            apply_output(dec("7"), Decimal::ZERO),
            Err(StockError::NonPositiveQuantity)
        );
        assert_eq!(
            apply_entry(dec("7"), dec("-1")),
            Err(StockError::NonPositiveQuantity)
        );
    }

    #[test]
    fn test_threshold_check() {
        assert_eq!(check_threshold(Decimal::ZERO), Ok(Decimal::ZERO));
        assert_eq!(
            check_threshold(dec("-0.001")),
            Err(StockError::NegativeThreshold)
        );
    }

    #[test]
    fn test_lot_defaults_and_normalizes() {
        assert_eq!(normalize_lot(None).unwrap(), DEFAULT_LOT);
        assert_eq!(normalize_lot(Some("   ")).unwrap(), DEFAULT_LOT);
        assert_eq!(normalize_lot(Some(" lot-7a ")).unwrap(), "LOT-7A");
        assert!(normalize_lot(Some(&"x".repeat(65))).is_err());
    }

    #[test]
    fn test_catalog_codes() {
        assert!(validate_sku("WID-001").is_ok());
        assert!(validate_sku("W1").is_err());
        assert!(validate_sku("wid-001").is_err());
        assert!(validate_warehouse_code("MAIN").is_ok());
        assert!(validate_warehouse_code("MAIN-1").is_err());
    }

    /// Received and cancelled orders are final
    #[test]
    fn test_order_lifecycle() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Sent));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Received));
        assert!(OrderStatus::Sent.can_transition_to(OrderStatus::Cancelled));
        for closed in [OrderStatus::Received, OrderStatus::Cancelled] {
            assert!(closed.is_closed());
            assert!(!closed.can_transition_to(OrderStatus::Sent));
            assert!(!closed.can_transition_to(OrderStatus::Received));
        }
    }

    /// Ordering from an alert and cancelling the order round-trips the alert
    #[test]
    fn test_alert_order_round_trip() {
        assert!(AlertStatus::New.can_transition_to(AlertStatus::OrderSent));
        assert!(AlertStatus::Active.can_transition_to(AlertStatus::OrderSent));
        assert!(AlertStatus::OrderSent.can_transition_to(AlertStatus::Active));
        assert!(!AlertStatus::OrderSent.can_transition_to(AlertStatus::New));
        assert!(!AlertStatus::Resolved.can_transition_to(AlertStatus::OrderSent));
    }

    #[test]
    fn test_pagination_defaults() {
        let p = Pagination::from_query(None, None);
        assert_eq!(p, Pagination { page: 1, per_page: 20 });
        assert_eq!(p.offset(), 0);

        let meta = PaginationMeta::new(p, 41);
        assert_eq!(meta.total_pages, 3);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Quantities with up to three decimals
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..1_000_000).prop_map(|milli| Decimal::new(milli, 3))
    }

    fn stock_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..1_000_000).prop_map(|milli| Decimal::new(milli, 3))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// An entry followed by an equal output restores the quantity
        #[test]
        fn prop_entry_then_output_restores(
            current in stock_strategy(),
            quantity in quantity_strategy(),
        ) {
            let after_entry = apply_entry(current, quantity).unwrap();
            prop_assert_eq!(apply_output(after_entry, quantity), Ok(current));
        }

        /// Outputs succeed exactly when enough stock is on hand
        #[test]
        fn prop_output_succeeds_iff_covered(
            current in stock_strategy(),
            quantity in quantity_strategy(),
        ) {
            match apply_output(current, quantity) {
                Ok(remaining) => {
                    prop_assert!(quantity <= current);
                    prop_assert_eq!(remaining, current - quantity);
                    prop_assert!(remaining >= Decimal::ZERO);
                }
                Err(StockError::Insufficient { requested, available }) => {
                    prop_assert!(quantity > current);
                    prop_assert_eq!(requested, quantity);
                    prop_assert_eq!(available, current);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        /// The ledger equals the sum of accepted movements
        #[test]
        fn prop_ledger_matches_movement_history(
            movements in prop::collection::vec((any::<bool>(), quantity_strategy()), 1..30),
        ) {
            let mut quantity = Decimal::ZERO;
            let mut received = Decimal::ZERO;
            let mut issued = Decimal::ZERO;

            for (inbound, amount) in movements {
                if inbound {
                    quantity = apply_entry(quantity, amount).unwrap();
                    received += amount;
                } else if let Ok(remaining) = apply_output(quantity, amount) {
                    quantity = remaining;
                    issued += amount;
                }
            }

            prop_assert_eq!(quantity, received - issued);
        }

        /// Page size always lands within bounds
        #[test]
        fn prop_pagination_is_clamped(
            page in proptest::option::of(0u32..10_000),
            per_page in proptest::option::of(0u32..10_000),
        ) {
            let p = Pagination::from_query(page, per_page);
            prop_assert!(p.page >= 1);
            prop_assert!(p.per_page >= 1 && p.per_page <= MAX_PER_PAGE);
            prop_assert!(p.offset() >= 0);
        }

        /// Lot identifiers are stored uppercase and trimmed
        #[test]
        fn prop_lot_normalization_is_stable(lot in "[a-zA-Z0-9-]{1,64}") {
            let normalized = normalize_lot(Some(&lot)).unwrap();
            prop_assert_eq!(&normalized, &lot.to_uppercase());
            prop_assert_eq!(normalize_lot(Some(&normalized)).unwrap(), normalized);
        }
    }
}
