//! Ledger movements and the alert decisions that follow them
//!
//! A product can be stocked in several lots and warehouses but carries a
//! single open `new` alert, so alerts are decided on the product's worst
//! ledger row. The backend locks the product's rows and alerts, then executes
//! the decision returned here inside the movement's transaction.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::alerting::{
    plan_reconciliation, OpenAlert, ReconcilePlan, ReconcileSnapshot, StockLevel,
};
use crate::models::{apply_entry, apply_output, check_threshold, StockError, StockLedgerEntry};

/// A change applied to one ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// Inbound stock, optionally replacing the row's minimum
    Entry {
        quantity: Decimal,
        min_stock: Option<Decimal>,
    },
    /// Outbound stock
    Output { quantity: Decimal },
    /// New minimum threshold
    Threshold { min_stock: Decimal },
}

impl Movement {
    /// Physical stock arrived; open alerts are settled by the delivery
    pub fn is_replenishment(&self) -> bool {
        matches!(self, Movement::Entry { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Movement::Entry { .. } => "entry",
            Movement::Output { .. } => "output",
            Movement::Threshold { .. } => "threshold",
        }
    }
}

/// Ledger values after a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerChange {
    pub quantity: Decimal,
    pub min_stock: Decimal,
}

/// Apply a movement to a ledger row's quantity and threshold.
///
/// Fails before anything is written: overdraws, non-positive quantities and
/// negative thresholds are rejected here.
pub fn apply_movement(
    quantity: Decimal,
    min_stock: Decimal,
    movement: &Movement,
) -> Result<LedgerChange, StockError> {
    match *movement {
        Movement::Entry {
            quantity: received,
            min_stock: new_min,
        } => Ok(LedgerChange {
            quantity: apply_entry(quantity, received)?,
            min_stock: match new_min {
                Some(t) => check_threshold(t)?,
                None => min_stock,
            },
        }),
        Movement::Output { quantity: issued } => Ok(LedgerChange {
            quantity: apply_output(quantity, issued)?,
            min_stock,
        }),
        Movement::Threshold { min_stock: new_min } => Ok(LedgerChange {
            quantity,
            min_stock: check_threshold(new_min)?,
        }),
    }
}

fn severity(level: StockLevel) -> u8 {
    match level {
        StockLevel::OutOfStock => 0,
        StockLevel::LowStock => 1,
        StockLevel::Normal => 2,
    }
}

/// The ledger row that determines the product's alert.
///
/// Most severe level first, then the smallest quantity; ties go to the lowest
/// id so repeated evaluation picks the same row.
pub fn worst_row(rows: &[StockLedgerEntry]) -> Option<&StockLedgerEntry> {
    rows.iter().min_by(|a, b| {
        severity(a.stock_level())
            .cmp(&severity(b.stock_level()))
            .then(a.quantity.cmp(&b.quantity))
            .then(a.id.cmp(&b.id))
    })
}

/// Alert state of the product at the time of the movement
#[derive(Debug, Clone)]
pub struct AlertState<'a> {
    pub open_alerts: &'a [OpenAlert],
    /// Most recent resolution carrying the replenishment marker
    pub last_replenished_at: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
    pub suppression_window: Duration,
}

/// What has to happen to the product's alerts after a movement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertDecision {
    /// Open alerts resolved by physical replenishment
    pub replenished: Vec<Uuid>,
    /// Reconciliation against the product's level afterwards
    pub plan: ReconcilePlan,
}

impl AlertDecision {
    pub fn notifies(&self) -> bool {
        self.plan.notifies()
    }
}

/// Decide the alert changes for a movement, given the product's level after it.
///
/// An entry resolves every open alert, including ones waiting on an order,
/// then re-evaluates without the suppression window so an insufficient
/// delivery still alerts. Other movements reconcile with suppression honoured.
pub fn decide_alerts(
    movement: &Movement,
    level: StockLevel,
    state: &AlertState<'_>,
) -> AlertDecision {
    if movement.is_replenishment() {
        let replenished: Vec<Uuid> = state.open_alerts.iter().map(|a| a.id).collect();
        let last_replenished_at = if replenished.is_empty() {
            state.last_replenished_at
        } else {
            Some(state.now)
        };

        let plan = plan_reconciliation(&ReconcileSnapshot {
            level,
            open_alerts: &[],
            last_replenished_at,
            now: state.now,
            suppression_window: state.suppression_window,
            honor_suppression: false,
        });

        return AlertDecision { replenished, plan };
    }

    let plan = plan_reconciliation(&ReconcileSnapshot {
        level,
        open_alerts: state.open_alerts,
        last_replenished_at: state.last_replenished_at,
        now: state.now,
        suppression_window: state.suppression_window,
        honor_suppression: true,
    });

    AlertDecision {
        replenished: Vec::new(),
        plan,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertClassification, AlertStatus};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn row(quantity: &str, min_stock: &str) -> StockLedgerEntry {
        let now = Utc::now();
        StockLedgerEntry {
            id: Uuid::new_v4(),
            product_id: Uuid::nil(),
            lot: "UNASSIGNED".to_string(),
            warehouse_id: Uuid::new_v4(),
            quantity: dec(quantity),
            min_stock: dec(min_stock),
            created_at: now,
            updated_at: now,
        }
    }

    fn state(open_alerts: &[OpenAlert]) -> AlertState<'_> {
        AlertState {
            open_alerts,
            last_replenished_at: None,
            now: Utc::now(),
            suppression_window: Duration::minutes(5),
        }
    }

    #[test]
    fn test_output_overdraw_is_rejected() {
        let result = apply_movement(dec("2"), dec("5"), &Movement::Output { quantity: dec("3") });
        assert_eq!(
            result,
            Err(StockError::Insufficient {
                requested: dec("3"),
                available: dec("2"),
            })
        );
    }

    #[test]
    fn test_entry_can_refresh_threshold() {
        let change = apply_movement(
            dec("2"),
            dec("5"),
            &Movement::Entry {
                quantity: dec("1"),
                min_stock: Some(dec("8")),
            },
        )
        .unwrap();
        assert_eq!(change, LedgerChange { quantity: dec("3"), min_stock: dec("8") });
    }

    #[test]
    fn test_worst_row_prefers_empty_then_smallest() {
        let rows = vec![row("2.7", "5"), row("0", "5"), row("99", "5")];
        assert_eq!(worst_row(&rows).unwrap().quantity, Decimal::ZERO);

        let rows = vec![row("4", "5"), row("3", "5")];
        assert_eq!(worst_row(&rows).unwrap().quantity, dec("3"));

        assert!(worst_row(&[]).is_none());
    }

    #[test]
    fn test_entry_resolves_order_sent_alerts() {
        let open = [OpenAlert {
            id: Uuid::new_v4(),
            status: AlertStatus::OrderSent,
            classification: AlertClassification::LowStock,
        }];
        let movement = Movement::Entry {
            quantity: dec("10"),
            min_stock: None,
        };

        let decision = decide_alerts(&movement, StockLevel::Normal, &state(&open));

        assert_eq!(decision.replenished, vec![open[0].id]);
        assert_eq!(decision.plan, ReconcilePlan::Unchanged);
        assert!(!decision.notifies());
    }

    #[test]
    fn test_short_entry_alerts_despite_replenishment() {
        let open = [OpenAlert {
            id: Uuid::new_v4(),
            status: AlertStatus::New,
            classification: AlertClassification::OutOfStock,
        }];
        let movement = Movement::Entry {
            quantity: dec("1"),
            min_stock: None,
        };

        let decision = decide_alerts(&movement, StockLevel::LowStock, &state(&open));

        assert_eq!(decision.replenished.len(), 1);
        assert_eq!(
            decision.plan,
            ReconcilePlan::Create {
                classification: AlertClassification::LowStock
            }
        );
    }

    #[test]
    fn test_output_honours_suppression() {
        let mut s = state(&[]);
        s.last_replenished_at = Some(s.now - Duration::seconds(60));
        let decision = decide_alerts(
            &Movement::Output { quantity: dec("1") },
            StockLevel::LowStock,
            &s,
        );
        assert!(decision.replenished.is_empty());
        assert!(matches!(decision.plan, ReconcilePlan::Suppressed { .. }));
    }
}
