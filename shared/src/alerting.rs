//! Stock alert evaluation and reconciliation planning
//!
//! The evaluator classifies a ledger row from its quantity and minimum
//! threshold. The planner decides what has to happen to the alert table for
//! that classification; the backend executes the resulting plan inside the
//! same transaction as the ledger mutation.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AlertClassification, AlertStatus};

/// Default window during which re-alerting after a replenishment is withheld
pub const DEFAULT_SUPPRESSION_WINDOW_SECS: i64 = 300;

/// Stock classification of a ledger row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    OutOfStock,
    LowStock,
    Normal,
}

impl StockLevel {
    /// Alert classification for this level, `None` when stock is sufficient
    pub fn classification(&self) -> Option<AlertClassification> {
        match self {
            StockLevel::OutOfStock => Some(AlertClassification::OutOfStock),
            StockLevel::LowStock => Some(AlertClassification::LowStock),
            StockLevel::Normal => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockLevel::OutOfStock => "out_of_stock",
            StockLevel::LowStock => "low_stock",
            StockLevel::Normal => "normal",
        }
    }
}

/// Classify stock against its minimum threshold.
///
/// Zero is out of stock regardless of threshold; a quantity equal to the
/// threshold counts as sufficient.
pub fn evaluate_stock(quantity: Decimal, threshold: Decimal) -> StockLevel {
    if quantity <= Decimal::ZERO {
        StockLevel::OutOfStock
    } else if quantity < threshold {
        StockLevel::LowStock
    } else {
        StockLevel::Normal
    }
}

/// An unresolved alert for the product being reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenAlert {
    pub id: Uuid,
    pub status: AlertStatus,
    pub classification: AlertClassification,
}

/// Everything the planner needs to decide on an alert change
#[derive(Debug, Clone)]
pub struct ReconcileSnapshot<'a> {
    pub level: StockLevel,
    pub open_alerts: &'a [OpenAlert],
    /// Most recent resolution carrying the replenishment marker
    pub last_replenished_at: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
    pub suppression_window: Duration,
    /// False right after the same request resolved alerts by replenishment
    pub honor_suppression: bool,
}

/// Outcome of reconciliation planning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilePlan {
    /// Insert the product's `new` alert
    Create { classification: AlertClassification },
    /// Update the classification of the existing `new` alert
    Reclassify {
        alert_id: Uuid,
        classification: AlertClassification,
    },
    /// Stock is back to normal; resolve these alerts
    Resolve { alert_ids: Vec<Uuid> },
    /// Shortage detected inside the suppression window
    Suppressed { classification: AlertClassification },
    Unchanged,
}

impl ReconcilePlan {
    /// Whether executing this plan must trigger the notifier
    pub fn notifies(&self) -> bool {
        matches!(
            self,
            ReconcilePlan::Create { .. } | ReconcilePlan::Reclassify { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReconcilePlan::Create { .. } => "create",
            ReconcilePlan::Reclassify { .. } => "reclassify",
            ReconcilePlan::Resolve { .. } => "resolve",
            ReconcilePlan::Suppressed { .. } => "suppressed",
            ReconcilePlan::Unchanged => "unchanged",
        }
    }
}

/// Whether a replenishment resolution at `resolved_at` still suppresses alerts
pub fn within_suppression_window(
    resolved_at: DateTime<Utc>,
    now: DateTime<Utc>,
    window: Duration,
) -> bool {
    let elapsed = now - resolved_at;
    elapsed >= Duration::zero() && elapsed <= window
}

/// Decide how the alert table must change for the evaluated stock level
pub fn plan_reconciliation(snapshot: &ReconcileSnapshot<'_>) -> ReconcilePlan {
    let Some(classification) = snapshot.level.classification() else {
        let alert_ids: Vec<Uuid> = snapshot
            .open_alerts
            .iter()
            .filter(|a| matches!(a.status, AlertStatus::New | AlertStatus::Active))
            .map(|a| a.id)
            .collect();

        return if alert_ids.is_empty() {
            ReconcilePlan::Unchanged
        } else {
            ReconcilePlan::Resolve { alert_ids }
        };
    };

    if let Some(existing) = snapshot
        .open_alerts
        .iter()
        .find(|a| a.status == AlertStatus::New)
    {
        return if existing.classification == classification {
            ReconcilePlan::Unchanged
        } else {
            ReconcilePlan::Reclassify {
                alert_id: existing.id,
                classification,
            }
        };
    }

    // Acknowledged or already ordered: the shortage is being handled
    if snapshot
        .open_alerts
        .iter()
        .any(|a| matches!(a.status, AlertStatus::Active | AlertStatus::OrderSent))
    {
        return ReconcilePlan::Unchanged;
    }

    if snapshot.honor_suppression {
        if let Some(resolved_at) = snapshot.last_replenished_at {
            if within_suppression_window(resolved_at, snapshot.now, snapshot.suppression_window) {
                return ReconcilePlan::Suppressed { classification };
            }
        }
    }

    ReconcilePlan::Create { classification }
}

/// Build the alert message for a shortage
pub fn alert_message(
    classification: AlertClassification,
    product_name: &str,
    sku: &str,
    warehouse_code: &str,
    quantity: Decimal,
    threshold: Decimal,
) -> String {
    match classification {
        AlertClassification::OutOfStock => format!(
            "{}: {} ({}) has no stock left in warehouse {} (minimum {})",
            classification.label(),
            product_name,
            sku,
            warehouse_code,
            threshold.normalize()
        ),
        AlertClassification::LowStock => format!(
            "{}: {} ({}) has {} left in warehouse {}, below the minimum of {}",
            classification.label(),
            product_name,
            sku,
            quantity.normalize(),
            warehouse_code,
            threshold.normalize()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn snapshot<'a>(level: StockLevel, open_alerts: &'a [OpenAlert]) -> ReconcileSnapshot<'a> {
        ReconcileSnapshot {
            level,
            open_alerts,
            last_replenished_at: None,
            now: Utc::now(),
            suppression_window: Duration::seconds(DEFAULT_SUPPRESSION_WINDOW_SECS),
            honor_suppression: true,
        }
    }

    fn open(status: AlertStatus, classification: AlertClassification) -> OpenAlert {
        OpenAlert {
            id: Uuid::new_v4(),
            status,
            classification,
        }
    }

    #[test]
    fn test_evaluate_boundaries() {
        assert_eq!(evaluate_stock(Decimal::ZERO, dec("5")), StockLevel::OutOfStock);
        assert_eq!(evaluate_stock(Decimal::ZERO, Decimal::ZERO), StockLevel::OutOfStock);
        assert_eq!(evaluate_stock(dec("4.999"), dec("5")), StockLevel::LowStock);
        assert_eq!(evaluate_stock(dec("5"), dec("5")), StockLevel::Normal);
        assert_eq!(evaluate_stock(dec("1"), Decimal::ZERO), StockLevel::Normal);
    }

    #[test]
    fn test_plan_creates_when_no_alert() {
        let plan = plan_reconciliation(&snapshot(StockLevel::LowStock, &[]));
        assert_eq!(
            plan,
            ReconcilePlan::Create {
                classification: AlertClassification::LowStock
            }
        );
        assert!(plan.notifies());
    }

    #[test]
    fn test_plan_reclassifies_new_alert() {
        let alerts = [open(AlertStatus::New, AlertClassification::LowStock)];
        let plan = plan_reconciliation(&snapshot(StockLevel::OutOfStock, &alerts));
        assert_eq!(
            plan,
            ReconcilePlan::Reclassify {
                alert_id: alerts[0].id,
                classification: AlertClassification::OutOfStock
            }
        );
    }

    #[test]
    fn test_plan_normal_skips_order_sent() {
        let alerts = [
            open(AlertStatus::OrderSent, AlertClassification::LowStock),
            open(AlertStatus::Active, AlertClassification::LowStock),
        ];
        let plan = plan_reconciliation(&snapshot(StockLevel::Normal, &alerts));
        assert_eq!(
            plan,
            ReconcilePlan::Resolve {
                alert_ids: vec![alerts[1].id]
            }
        );
        assert!(!plan.notifies());
    }

    #[test]
    fn test_suppression_window_edges() {
        let now = Utc::now();
        let window = Duration::minutes(5);
        assert!(within_suppression_window(now - Duration::minutes(5), now, window));
        assert!(!within_suppression_window(now - Duration::seconds(301), now, window));
        assert!(!within_suppression_window(now + Duration::seconds(1), now, window));
    }

    #[test]
    fn test_suppression_can_be_bypassed() {
        let mut snap = snapshot(StockLevel::LowStock, &[]);
        snap.last_replenished_at = Some(snap.now - Duration::seconds(30));
        assert!(matches!(plan_reconciliation(&snap), ReconcilePlan::Suppressed { .. }));

        snap.honor_suppression = false;
        assert!(matches!(plan_reconciliation(&snap), ReconcilePlan::Create { .. }));
    }

    #[test]
    fn test_alert_message_formats_decimals() {
        let msg = alert_message(
            AlertClassification::LowStock,
            "Widget",
            "WID-001",
            "MAIN",
            dec("3.000"),
            dec("5.000"),
        );
        assert_eq!(
            msg,
            "Low stock: Widget (WID-001) has 3 left in warehouse MAIN, below the minimum of 5"
        );
    }
}
