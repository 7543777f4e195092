//! Inventory service: stock ledger mutations (entries and outputs)
//!
//! Every mutation locks its product and ledger row, records the movement,
//! reconciles the product's alerts and commits as one transaction. Alert mail goes out only
//! after the commit.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    apply_movement, check_threshold, normalize_lot, Alert, Movement, OrderStatus,
    PaginatedResponse, Pagination, Product, SortDirection, StockEntry, StockError,
    StockLedgerEntry, StockLevel, StockOutput, Warehouse,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::alert::{AlertReconciler, ReconcileOutcome};
use crate::services::notification::{AlertNotice, NotificationService};

pub(crate) const INVENTORY_COLUMNS: &str =
    "id, product_id, lot, warehouse_id, quantity, min_stock, created_at, updated_at";

const ENTRY_COLUMNS: &str = "id, inventory_id, product_id, lot, warehouse_id, quantity, \
                             supplier_id, order_id, unit_cost, notes, created_by, created_at";

const OUTPUT_COLUMNS: &str =
    "id, inventory_id, product_id, lot, warehouse_id, quantity, reason, created_by, created_at";

/// Inventory service for stock movements and ledger queries
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
    reconciler: AlertReconciler,
    notifier: NotificationService,
}

/// Input for recording inbound stock
#[derive(Debug, Deserialize)]
pub struct RecordEntryInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub lot: Option<String>,
    pub quantity: Decimal,
    /// Replaces the ledger row's minimum threshold when present
    pub min_stock: Option<Decimal>,
    pub supplier_id: Option<Uuid>,
    /// Order this delivery fulfils; the order is marked received
    pub order_id: Option<Uuid>,
    pub unit_cost: Option<Decimal>,
    pub notes: Option<String>,
}

/// Input for recording outbound stock
#[derive(Debug, Deserialize)]
pub struct RecordOutputInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub lot: Option<String>,
    pub quantity: Decimal,
    pub reason: Option<String>,
}

/// Input for changing a ledger row's minimum threshold
#[derive(Debug, Deserialize)]
pub struct UpdateThresholdInput {
    pub min_stock: Decimal,
}

/// Ledger row with its evaluated stock level
#[derive(Debug, Clone, Serialize)]
pub struct InventoryView {
    #[serde(flatten)]
    pub inventory: StockLedgerEntry,
    pub level: StockLevel,
}

impl From<StockLedgerEntry> for InventoryView {
    fn from(inventory: StockLedgerEntry) -> Self {
        let level = inventory.stock_level();
        Self { inventory, level }
    }
}

/// Result of an entry
#[derive(Debug, Clone, Serialize)]
pub struct EntryResult {
    pub entry: StockEntry,
    pub inventory: InventoryView,
    /// Alerts resolved by this replenishment
    pub resolved_alerts: u64,
    /// Alert raised because the replenishment was not enough
    pub alert: Option<Alert>,
}

/// Result of an output
#[derive(Debug, Clone, Serialize)]
pub struct OutputResult {
    pub output: StockOutput,
    pub inventory: InventoryView,
    pub alert: Option<Alert>,
}

/// Result of a threshold change
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdResult {
    pub inventory: InventoryView,
    pub alert: Option<Alert>,
}

/// Stock level filter for ledger listings
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LevelFilter {
    /// Below threshold, including empty rows
    BelowMinimum,
    OutOfStock,
}

/// Query parameters for listing ledger rows
#[derive(Debug, Deserialize, Validate, Default)]
pub struct InventoryQuery {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub level: Option<LevelFilter>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub per_page: Option<u32>,
}

/// Query parameters for listing entries and outputs
#[derive(Debug, Deserialize, Validate, Default)]
pub struct MovementQuery {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    #[serde(default)]
    pub direction: SortDirection,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub per_page: Option<u32>,
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool, notifier: NotificationService, suppression_window: Duration) -> Self {
        Self {
            db,
            reconciler: AlertReconciler::new(suppression_window),
            notifier,
        }
    }

    /// Record inbound stock.
    ///
    /// Physical replenishment resolves every open alert of the product,
    /// including alerts waiting on an order; the product is then re-evaluated
    /// in case the delivery was not enough.
    pub async fn record_entry(
        &self,
        user_id: Uuid,
        input: RecordEntryInput,
    ) -> AppResult<EntryResult> {
        let lot = normalize_lot(input.lot.as_deref()).map_err(|e| AppError::validation("lot", e))?;
        if matches!(input.unit_cost, Some(cost) if cost < Decimal::ZERO) {
            return Err(AppError::validation("unit_cost", "Unit cost cannot be negative"));
        }
        let movement = Movement::Entry {
            quantity: input.quantity,
            min_stock: input.min_stock,
        };
        // Rejects bad quantities and thresholds before anything is locked
        apply_movement(Decimal::ZERO, Decimal::ZERO, &movement)?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let product = lock_active_product(&mut tx, input.product_id).await?;
        let warehouse = load_active_warehouse(&mut tx, input.warehouse_id).await?;

        if let Some(supplier_id) = input.supplier_id {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)",
            )
            .bind(supplier_id)
            .fetch_one(&mut *tx)
            .await?;
            if !exists {
                return Err(AppError::NotFound("Supplier".to_string()));
            }
        }

        if let Some(order_id) = input.order_id {
            fulfil_order(&mut tx, order_id, product.id, now).await?;
        }

        // First delivery of a lot opens its row with the product's minimum
        sqlx::query(
            r#"
            INSERT INTO inventories (product_id, lot, warehouse_id, quantity, min_stock)
            VALUES ($1, $2, $3, 0, $4)
            ON CONFLICT (product_id, lot, warehouse_id) DO NOTHING
            "#,
        )
        .bind(product.id)
        .bind(&lot)
        .bind(warehouse.id)
        .bind(product.min_stock)
        .execute(&mut *tx)
        .await?;

        let current = lock_ledger_row(&mut tx, product.id, &lot, warehouse.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;
        let inventory = write_change(&mut tx, &current, &movement).await?;

        let entry = sqlx::query_as::<_, StockEntry>(&format!(
            r#"
            INSERT INTO entries (
                inventory_id, product_id, lot, warehouse_id, quantity,
                supplier_id, order_id, unit_cost, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(inventory.id)
        .bind(product.id)
        .bind(&lot)
        .bind(warehouse.id)
        .bind(input.quantity)
        .bind(input.supplier_id)
        .bind(input.order_id)
        .bind(input.unit_cost)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let outcome = self
            .reconciler
            .reconcile(&mut tx, product.id, &movement, now)
            .await?;

        tx.commit().await?;

        tracing::info!(
            entry_id = %entry.id,
            product_id = %product.id,
            warehouse = %warehouse.code,
            quantity = %input.quantity,
            resolved_alerts = outcome.replenished,
            user_id = %user_id,
            "Stock entry recorded"
        );

        self.notify(&outcome).await;

        Ok(EntryResult {
            entry,
            inventory: inventory.into(),
            resolved_alerts: outcome.replenished,
            alert: outcome.alert,
        })
    }

    /// Record outbound stock.
    ///
    /// Fails without touching the ledger when the row holds less than requested.
    pub async fn record_output(
        &self,
        user_id: Uuid,
        input: RecordOutputInput,
    ) -> AppResult<OutputResult> {
        let lot = normalize_lot(input.lot.as_deref()).map_err(|e| AppError::validation("lot", e))?;
        if input.quantity <= Decimal::ZERO {
            return Err(StockError::NonPositiveQuantity.into());
        }
        let movement = Movement::Output {
            quantity: input.quantity,
        };

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        lock_active_product(&mut tx, input.product_id).await?;
        let warehouse = load_active_warehouse(&mut tx, input.warehouse_id).await?;

        let current = lock_ledger_row(&mut tx, input.product_id, &lot, warehouse.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;
        let inventory = write_change(&mut tx, &current, &movement).await?;

        let output = sqlx::query_as::<_, StockOutput>(&format!(
            r#"
            INSERT INTO outputs (inventory_id, product_id, lot, warehouse_id, quantity, reason, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {OUTPUT_COLUMNS}
            "#
        ))
        .bind(inventory.id)
        .bind(inventory.product_id)
        .bind(&inventory.lot)
        .bind(inventory.warehouse_id)
        .bind(input.quantity)
        .bind(&input.reason)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let outcome = self
            .reconciler
            .reconcile(&mut tx, inventory.product_id, &movement, now)
            .await?;

        tx.commit().await?;

        tracing::info!(
            output_id = %output.id,
            product_id = %inventory.product_id,
            warehouse = %warehouse.code,
            quantity = %input.quantity,
            remaining = %inventory.quantity,
            user_id = %user_id,
            "Stock output recorded"
        );

        self.notify(&outcome).await;

        Ok(OutputResult {
            output,
            inventory: inventory.into(),
            alert: outcome.alert,
        })
    }

    /// Change a ledger row's minimum threshold and re-evaluate its product
    pub async fn update_threshold(
        &self,
        inventory_id: Uuid,
        user_id: Uuid,
        input: UpdateThresholdInput,
    ) -> AppResult<ThresholdResult> {
        let movement = Movement::Threshold {
            min_stock: input.min_stock,
        };
        check_threshold(input.min_stock)?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let product_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT product_id FROM inventories WHERE id = $1",
        )
        .bind(inventory_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        // Product first, same lock order as entries and outputs
        lock_product(&mut tx, product_id).await?;

        let current = sqlx::query_as::<_, StockLedgerEntry>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventories WHERE id = $1 FOR UPDATE"
        ))
        .bind(inventory_id)
        .fetch_one(&mut *tx)
        .await?;
        let inventory = write_change(&mut tx, &current, &movement).await?;

        let outcome = self
            .reconciler
            .reconcile(&mut tx, product_id, &movement, now)
            .await?;

        tx.commit().await?;

        tracing::info!(
            inventory_id = %inventory_id,
            min_stock = %input.min_stock,
            user_id = %user_id,
            "Minimum stock updated"
        );

        self.notify(&outcome).await;

        Ok(ThresholdResult {
            inventory: inventory.into(),
            alert: outcome.alert,
        })
    }

    /// Get a ledger row by ID
    pub async fn get_inventory(&self, inventory_id: Uuid) -> AppResult<InventoryView> {
        let inventory = sqlx::query_as::<_, StockLedgerEntry>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventories WHERE id = $1"
        ))
        .bind(inventory_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        Ok(inventory.into())
    }

    /// List ledger rows
    pub async fn list_inventory(
        &self,
        query: InventoryQuery,
    ) -> AppResult<PaginatedResponse<InventoryView>> {
        query.validate()?;
        let pagination = Pagination::from_query(query.page, query.per_page);
        let below_minimum = query.level == Some(LevelFilter::BelowMinimum);
        let out_of_stock = query.level == Some(LevelFilter::OutOfStock);

        let filter = r#"
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
              AND (NOT $3 OR quantity < min_stock OR quantity = 0)
              AND (NOT $4 OR quantity = 0)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM inventories {filter}"
        ))
        .bind(query.product_id)
        .bind(query.warehouse_id)
        .bind(below_minimum)
        .bind(out_of_stock)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, StockLedgerEntry>(&format!(
            r#"
            SELECT {INVENTORY_COLUMNS}
            FROM inventories
            {filter}
            ORDER BY updated_at DESC, id
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(query.product_id)
        .bind(query.warehouse_id)
        .bind(below_minimum)
        .bind(out_of_stock)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(
            rows.into_iter().map(InventoryView::from).collect(),
            pagination,
            total.max(0) as u64,
        ))
    }

    /// List entries
    pub async fn list_entries(
        &self,
        query: MovementQuery,
    ) -> AppResult<PaginatedResponse<StockEntry>> {
        query.validate()?;
        let pagination = Pagination::from_query(query.page, query.per_page);

        let total = count_movements(&self.db, "entries", &query).await?;
        let entries = sqlx::query_as::<_, StockEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM entries
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
            ORDER BY created_at {}, id
            LIMIT $3 OFFSET $4
            "#,
            query.direction.as_sql()
        ))
        .bind(query.product_id)
        .bind(query.warehouse_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(entries, pagination, total))
    }

    /// List outputs
    pub async fn list_outputs(
        &self,
        query: MovementQuery,
    ) -> AppResult<PaginatedResponse<StockOutput>> {
        query.validate()?;
        let pagination = Pagination::from_query(query.page, query.per_page);

        let total = count_movements(&self.db, "outputs", &query).await?;
        let outputs = sqlx::query_as::<_, StockOutput>(&format!(
            r#"
            SELECT {OUTPUT_COLUMNS}
            FROM outputs
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
            ORDER BY created_at {}, id
            LIMIT $3 OFFSET $4
            "#,
            query.direction.as_sql()
        ))
        .bind(query.product_id)
        .bind(query.warehouse_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(outputs, pagination, total))
    }

    /// Mail the alert raised by a committed reconciliation, if any
    async fn notify(&self, outcome: &ReconcileOutcome) {
        if let Some(alert) = outcome.alert_to_notify() {
            let ctx = &outcome.context;
            let notice = AlertNotice::new(alert, &ctx.product_name, &ctx.sku);
            self.notifier.notify_alert(&notice).await;
        }
    }
}

/// Count movement rows; `table` is always a fixed table name
async fn count_movements(db: &PgPool, table: &'static str, query: &MovementQuery) -> AppResult<u64> {
    let total = sqlx::query_scalar::<_, i64>(&format!(
        r#"
        SELECT COUNT(*) FROM {table}
        WHERE ($1::uuid IS NULL OR product_id = $1)
          AND ($2::uuid IS NULL OR warehouse_id = $2)
        "#
    ))
    .bind(query.product_id)
    .bind(query.warehouse_id)
    .fetch_one(db)
    .await?;

    Ok(total.max(0) as u64)
}

/// Lock the product row; every ledger mutation takes this lock first
async fn lock_product(conn: &mut PgConnection, product_id: Uuid) -> AppResult<Product> {
    sqlx::query_as::<_, Product>(
        r#"
        SELECT id, sku, name, description, unit, min_stock, preferred_supplier_id,
               is_active, created_at, updated_at
        FROM products
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

async fn lock_active_product(conn: &mut PgConnection, product_id: Uuid) -> AppResult<Product> {
    let product = lock_product(conn, product_id).await?;
    if !product.is_active {
        return Err(AppError::Inactive(format!("Product {}", product.sku)));
    }
    Ok(product)
}

async fn load_active_warehouse(
    conn: &mut PgConnection,
    warehouse_id: Uuid,
) -> AppResult<Warehouse> {
    let warehouse = sqlx::query_as::<_, Warehouse>(
        r#"
        SELECT id, code, name, location, is_active, created_at, updated_at
        FROM warehouses
        WHERE id = $1
        "#,
    )
    .bind(warehouse_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

    if !warehouse.is_active {
        return Err(AppError::Inactive(format!("Warehouse {}", warehouse.code)));
    }
    Ok(warehouse)
}

async fn lock_ledger_row(
    conn: &mut PgConnection,
    product_id: Uuid,
    lot: &str,
    warehouse_id: Uuid,
) -> AppResult<Option<StockLedgerEntry>> {
    let row = sqlx::query_as::<_, StockLedgerEntry>(&format!(
        r#"
        SELECT {INVENTORY_COLUMNS}
        FROM inventories
        WHERE product_id = $1 AND lot = $2 AND warehouse_id = $3
        FOR UPDATE
        "#
    ))
    .bind(product_id)
    .bind(lot)
    .bind(warehouse_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Apply a movement to a locked row and store the result
async fn write_change(
    conn: &mut PgConnection,
    current: &StockLedgerEntry,
    movement: &Movement,
) -> AppResult<StockLedgerEntry> {
    let change = apply_movement(current.quantity, current.min_stock, movement)?;

    let row = sqlx::query_as::<_, StockLedgerEntry>(&format!(
        r#"
        UPDATE inventories SET quantity = $2, min_stock = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING {INVENTORY_COLUMNS}
        "#
    ))
    .bind(current.id)
    .bind(change.quantity)
    .bind(change.min_stock)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Lock an open order for the delivered product and mark it received
async fn fulfil_order(
    conn: &mut PgConnection,
    order_id: Uuid,
    product_id: Uuid,
    now: chrono::DateTime<Utc>,
) -> AppResult<()> {
    let (status, order_product_id) = sqlx::query_as::<_, (OrderStatus, Uuid)>(
        "SELECT status, product_id FROM orders WHERE id = $1 FOR UPDATE",
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

    if order_product_id != product_id {
        return Err(AppError::validation(
            "order_id",
            "Order is for a different product",
        ));
    }
    if !status.can_transition_to(OrderStatus::Received) {
        return Err(AppError::InvalidStateTransition(format!(
            "Cannot receive an order in status {}",
            status.as_str()
        )));
    }

    sqlx::query("UPDATE orders SET status = 'received', received_at = $2 WHERE id = $1")
        .bind(order_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
