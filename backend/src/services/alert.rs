//! Stock alert service: reconciliation against the ledger and alert management

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use shared::{
    alert_message, decide_alerts, worst_row, Alert, AlertClassification, AlertResolution,
    AlertState, AlertStatus, Movement, OpenAlert, PaginatedResponse, Pagination, ReconcilePlan,
    SortDirection, StockLedgerEntry, StockLevel,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::inventory::INVENTORY_COLUMNS;

const ALERT_COLUMNS: &str = "id, product_id, inventory_id, classification, status, message, \
                             resolution, created_at, updated_at, resolved_at";

/// Alert service for listing and moving alerts through their lifecycle
#[derive(Clone)]
pub struct AlertService {
    db: PgPool,
}

/// Ledger row together with the names used in alert messages
#[derive(Debug, Clone)]
pub struct LedgerContext {
    pub inventory: StockLedgerEntry,
    pub product_name: String,
    pub sku: String,
    pub warehouse_code: String,
}

#[derive(Debug, FromRow)]
struct NamesRow {
    product_name: String,
    sku: String,
    warehouse_code: String,
}

/// Result of reconciling a product's alerts
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Level of the product's worst ledger row
    pub level: StockLevel,
    pub plan: ReconcilePlan,
    /// The created or reclassified alert
    pub alert: Option<Alert>,
    /// Alerts resolved by a replenishment
    pub replenished: u64,
    /// Worst ledger row the plan was made for
    pub context: LedgerContext,
}

impl ReconcileOutcome {
    /// Alert that must be announced once the transaction commits
    pub fn alert_to_notify(&self) -> Option<&Alert> {
        if self.plan.notifies() {
            self.alert.as_ref()
        } else {
            None
        }
    }
}

/// Keeps the alert table consistent with the ledger.
///
/// A product has one open `new` alert at most, so the decision is made on the
/// product's worst ledger row, not on the row a movement touched. All methods
/// run on the caller's connection so they share the movement's transaction.
#[derive(Debug, Clone, Copy)]
pub struct AlertReconciler {
    suppression_window: Duration,
}

impl AlertReconciler {
    pub fn new(suppression_window: Duration) -> Self {
        Self { suppression_window }
    }

    /// Re-evaluate the product after `movement` and apply the alert changes.
    ///
    /// Expects the movement to be written already in this transaction.
    pub async fn reconcile(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        movement: &Movement,
        now: DateTime<Utc>,
    ) -> AppResult<ReconcileOutcome> {
        let rows = sqlx::query_as::<_, StockLedgerEntry>(&format!(
            r#"
            SELECT {INVENTORY_COLUMNS}
            FROM inventories
            WHERE product_id = $1
            ORDER BY id
            FOR UPDATE
            "#
        ))
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;

        let worst = worst_row(&rows)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;
        let level = worst.stock_level();
        let context = load_ledger_context(&mut *conn, worst).await?;

        let open_alerts = sqlx::query_as::<_, (Uuid, AlertStatus, AlertClassification)>(
            r#"
            SELECT id, status, classification
            FROM alerts
            WHERE product_id = $1 AND status <> 'resolved'
            ORDER BY created_at
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(|(id, status, classification)| OpenAlert {
            id,
            status,
            classification,
        })
        .collect::<Vec<_>>();

        let last_replenished_at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            r#"
            SELECT MAX(resolved_at)
            FROM alerts
            WHERE product_id = $1 AND resolution = 'replenished'
            "#,
        )
        .bind(product_id)
        .fetch_one(&mut *conn)
        .await?;

        let decision = decide_alerts(
            movement,
            level,
            &AlertState {
                open_alerts: &open_alerts,
                last_replenished_at,
                now,
                suppression_window: self.suppression_window,
            },
        );

        let replenished = if decision.replenished.is_empty() {
            0
        } else {
            resolve_alerts(
                &mut *conn,
                &decision.replenished,
                AlertResolution::Replenished,
                AlertResolution::Replenished.note(),
                now,
            )
            .await?
        };

        let plan = decision.plan;
        let alert = match &plan {
            ReconcilePlan::Create { classification }
            | ReconcilePlan::Reclassify { classification, .. } => {
                Some(upsert_new_alert(&mut *conn, &context, *classification, now).await?)
            }
            ReconcilePlan::Resolve { alert_ids } => {
                let note = format!(
                    "{}: {} on hand (minimum {})",
                    AlertResolution::StockNormalized.note(),
                    context.inventory.quantity.normalize(),
                    context.inventory.min_stock.normalize()
                );
                resolve_alerts(
                    &mut *conn,
                    alert_ids,
                    AlertResolution::StockNormalized,
                    &note,
                    now,
                )
                .await?;
                None
            }
            ReconcilePlan::Suppressed { classification } => {
                tracing::info!(
                    product_id = %product_id,
                    classification = classification.as_str(),
                    "Alert suppressed after recent replenishment"
                );
                None
            }
            ReconcilePlan::Unchanged => None,
        };

        tracing::debug!(
            product_id = %product_id,
            movement = movement.as_str(),
            rows = rows.len(),
            worst_inventory_id = %context.inventory.id,
            level = level.as_str(),
            plan = plan.kind(),
            replenished,
            "Alert reconciliation"
        );

        Ok(ReconcileOutcome {
            level,
            plan,
            alert,
            replenished,
            context,
        })
    }
}

async fn load_ledger_context(
    conn: &mut PgConnection,
    inventory: StockLedgerEntry,
) -> AppResult<LedgerContext> {
    let names = sqlx::query_as::<_, NamesRow>(
        r#"
        SELECT p.name AS product_name, p.sku, w.code AS warehouse_code
        FROM products p, warehouses w
        WHERE p.id = $1 AND w.id = $2
        "#,
    )
    .bind(inventory.product_id)
    .bind(inventory.warehouse_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(LedgerContext {
        inventory,
        product_name: names.product_name,
        sku: names.sku,
        warehouse_code: names.warehouse_code,
    })
}

/// Insert the product's `new` alert or update it in place
async fn upsert_new_alert(
    conn: &mut PgConnection,
    ctx: &LedgerContext,
    classification: AlertClassification,
    now: DateTime<Utc>,
) -> AppResult<Alert> {
    let message = alert_message(
        classification,
        &ctx.product_name,
        &ctx.sku,
        &ctx.warehouse_code,
        ctx.inventory.quantity,
        ctx.inventory.min_stock,
    );

    let alert = sqlx::query_as::<_, Alert>(&format!(
        r#"
        INSERT INTO alerts (product_id, inventory_id, classification, status, message, created_at, updated_at)
        VALUES ($1, $2, $3, 'new', $4, $5, $5)
        ON CONFLICT (product_id) WHERE status = 'new'
        DO UPDATE SET inventory_id = EXCLUDED.inventory_id,
                      classification = EXCLUDED.classification,
                      message = EXCLUDED.message,
                      resolution = NULL,
                      resolved_at = NULL,
                      updated_at = EXCLUDED.updated_at
        RETURNING {ALERT_COLUMNS}
        "#
    ))
    .bind(ctx.inventory.product_id)
    .bind(ctx.inventory.id)
    .bind(classification)
    .bind(&message)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(alert)
}

async fn resolve_alerts(
    conn: &mut PgConnection,
    alert_ids: &[Uuid],
    resolution: AlertResolution,
    note: &str,
    now: DateTime<Utc>,
) -> AppResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE alerts
        SET status = 'resolved',
            resolution = $2,
            resolved_at = $3,
            updated_at = $3,
            message = message || ' | ' || $4
        WHERE id = ANY($1) AND status <> 'resolved'
        "#,
    )
    .bind(alert_ids)
    .bind(resolution)
    .bind(now)
    .bind(note)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Sortable alert columns
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl AlertSortField {
    fn column(&self) -> &'static str {
        match self {
            AlertSortField::CreatedAt => "created_at",
            AlertSortField::UpdatedAt => "updated_at",
        }
    }
}

/// Query parameters for listing alerts
#[derive(Debug, Deserialize, Validate, Default)]
pub struct AlertQuery {
    pub status: Option<AlertStatus>,
    pub classification: Option<AlertClassification>,
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub sort: AlertSortField,
    #[serde(default)]
    pub direction: SortDirection,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub per_page: Option<u32>,
}

/// Input for manually resolving an alert
#[derive(Debug, Deserialize, Default)]
pub struct ResolveAlertInput {
    pub note: Option<String>,
}

impl AlertService {
    /// Create a new AlertService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List alerts
    pub async fn list_alerts(&self, query: AlertQuery) -> AppResult<PaginatedResponse<Alert>> {
        query.validate()?;
        let pagination = Pagination::from_query(query.page, query.per_page);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM alerts
            WHERE ($1::alert_status IS NULL OR status = $1)
              AND ($2::alert_classification IS NULL OR classification = $2)
              AND ($3::uuid IS NULL OR product_id = $3)
            "#,
        )
        .bind(query.status)
        .bind(query.classification)
        .bind(query.product_id)
        .fetch_one(&self.db)
        .await?;

        let alerts = sqlx::query_as::<_, Alert>(&format!(
            r#"
            SELECT {ALERT_COLUMNS}
            FROM alerts
            WHERE ($1::alert_status IS NULL OR status = $1)
              AND ($2::alert_classification IS NULL OR classification = $2)
              AND ($3::uuid IS NULL OR product_id = $3)
            ORDER BY {} {}, id
            LIMIT $4 OFFSET $5
            "#,
            query.sort.column(),
            query.direction.as_sql()
        ))
        .bind(query.status)
        .bind(query.classification)
        .bind(query.product_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(alerts, pagination, total.max(0) as u64))
    }

    /// Get an alert by ID
    pub async fn get_alert(&self, alert_id: Uuid) -> AppResult<Alert> {
        sqlx::query_as::<_, Alert>(&format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = $1"))
            .bind(alert_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Alert".to_string()))
    }

    /// Acknowledge a new alert (`new` -> `active`)
    pub async fn acknowledge(&self, alert_id: Uuid) -> AppResult<Alert> {
        let mut tx = self.db.begin().await?;
        let current = lock_alert(&mut tx, alert_id).await?;

        if current.status != AlertStatus::New {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot acknowledge an alert in status {}",
                current.status.as_str()
            )));
        }

        let alert = sqlx::query_as::<_, Alert>(&format!(
            r#"
            UPDATE alerts SET status = 'active', updated_at = NOW()
            WHERE id = $1
            RETURNING {ALERT_COLUMNS}
            "#
        ))
        .bind(alert_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(alert_id = %alert_id, "Alert acknowledged");
        Ok(alert)
    }

    /// Resolve an open alert by hand
    pub async fn resolve_manually(
        &self,
        alert_id: Uuid,
        user_id: Uuid,
        input: ResolveAlertInput,
    ) -> AppResult<Alert> {
        let mut tx = self.db.begin().await?;
        let current = lock_alert(&mut tx, alert_id).await?;

        if !current.status.can_transition_to(AlertStatus::Resolved) {
            return Err(AppError::InvalidStateTransition(
                "Alert is already resolved".to_string(),
            ));
        }

        let note = match input.note.as_deref().map(str::trim) {
            Some(note) if !note.is_empty() => {
                format!("{}: {}", AlertResolution::Manual.note(), note)
            }
            _ => AlertResolution::Manual.note().to_string(),
        };
        let now = Utc::now();
        resolve_alerts(&mut tx, &[alert_id], AlertResolution::Manual, &note, now).await?;

        let alert = sqlx::query_as::<_, Alert>(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE id = $1"
        ))
        .bind(alert_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(alert_id = %alert_id, user_id = %user_id, "Alert resolved manually");
        Ok(alert)
    }
}

/// Lock an alert row for a status change
pub(crate) async fn lock_alert(conn: &mut PgConnection, alert_id: Uuid) -> AppResult<Alert> {
    sqlx::query_as::<_, Alert>(&format!(
        "SELECT {ALERT_COLUMNS} FROM alerts WHERE id = $1 FOR UPDATE"
    ))
    .bind(alert_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Alert".to_string()))
}
