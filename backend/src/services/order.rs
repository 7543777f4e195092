//! Replenishment order service
//!
//! Orders are placed by users, either directly or in response to an alert.
//! Placing an order against an alert moves the alert to `order_sent`;
//! receiving the order books the delivery as a stock entry.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    validate_quantity, AlertStatus, Order, OrderStatus, PaginatedResponse, Pagination,
    SortDirection,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::alert::lock_alert;
use crate::services::inventory::{EntryResult, InventoryService, RecordEntryInput};

const ORDER_COLUMNS: &str = "id, alert_id, product_id, supplier_id, quantity, status, notes, \
                             created_by, created_at, sent_at, received_at";

/// Order service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    inventory: InventoryService,
}

/// Input for placing an order
#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    /// Alert being answered; the product is taken from it
    pub alert_id: Option<Uuid>,
    /// Required when no alert is given
    pub product_id: Option<Uuid>,
    /// Defaults to the product's preferred supplier
    pub supplier_id: Option<Uuid>,
    pub quantity: Decimal,
    pub notes: Option<String>,
}

/// Input for receiving an order
#[derive(Debug, Deserialize)]
pub struct ReceiveOrderInput {
    pub warehouse_id: Uuid,
    pub lot: Option<String>,
    /// Defaults to the ordered quantity
    pub quantity: Option<Decimal>,
    pub unit_cost: Option<Decimal>,
    pub notes: Option<String>,
}

/// Received order with the entry that booked it
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedOrder {
    pub order: Order,
    pub receipt: EntryResult,
}

/// Query parameters for listing orders
#[derive(Debug, Deserialize, Validate, Default)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub supplier_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub direction: SortDirection,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub per_page: Option<u32>,
}

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool, inventory: InventoryService) -> Self {
        Self { db, inventory }
    }

    /// Place an order
    pub async fn create_order(&self, user_id: Uuid, input: CreateOrderInput) -> AppResult<Order> {
        validate_quantity(input.quantity).map_err(|e| AppError::validation("quantity", e))?;

        let mut tx = self.db.begin().await?;

        let product_id = match input.alert_id {
            Some(alert_id) => {
                let alert = lock_alert(&mut tx, alert_id).await?;
                if !alert.status.can_transition_to(AlertStatus::OrderSent) {
                    return Err(AppError::InvalidStateTransition(format!(
                        "Cannot order against an alert in status {}",
                        alert.status.as_str()
                    )));
                }
                if matches!(input.product_id, Some(id) if id != alert.product_id) {
                    return Err(AppError::validation(
                        "product_id",
                        "Product does not match the alert",
                    ));
                }

                sqlx::query(
                    "UPDATE alerts SET status = 'order_sent', updated_at = NOW() WHERE id = $1",
                )
                .bind(alert_id)
                .execute(&mut *tx)
                .await?;

                alert.product_id
            }
            None => input
                .product_id
                .ok_or_else(|| AppError::validation("product_id", "Product is required"))?,
        };

        let preferred_supplier_id = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT preferred_supplier_id FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let supplier_id = input
            .supplier_id
            .or(preferred_supplier_id)
            .ok_or_else(|| {
                AppError::validation("supplier_id", "Product has no preferred supplier")
            })?;
        ensure_active_supplier(&mut tx, supplier_id).await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (alert_id, product_id, supplier_id, quantity, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(input.alert_id)
        .bind(product_id)
        .bind(supplier_id)
        .bind(input.quantity)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            product_id = %product_id,
            alert_id = ?input.alert_id,
            user_id = %user_id,
            "Order created"
        );
        Ok(order)
    }

    /// Get an order by ID
    pub async fn get_order(&self, order_id: Uuid) -> AppResult<Order> {
        sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))
    }

    /// List orders
    pub async fn list_orders(&self, query: OrderQuery) -> AppResult<PaginatedResponse<Order>> {
        query.validate()?;
        let pagination = Pagination::from_query(query.page, query.per_page);

        let filter = r#"
            WHERE ($1::order_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR supplier_id = $2)
              AND ($3::uuid IS NULL OR product_id = $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM orders {filter}"))
            .bind(query.status)
            .bind(query.supplier_id)
            .bind(query.product_id)
            .fetch_one(&self.db)
            .await?;

        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            {filter}
            ORDER BY created_at {}, id
            LIMIT $4 OFFSET $5
            "#,
            query.direction.as_sql()
        ))
        .bind(query.status)
        .bind(query.supplier_id)
        .bind(query.product_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(orders, pagination, total.max(0) as u64))
    }

    /// Mark an order as sent to the supplier
    pub async fn mark_sent(&self, order_id: Uuid, user_id: Uuid) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;
        let current = lock_order(&mut tx, order_id).await?;
        ensure_transition(current.status, OrderStatus::Sent)?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders SET status = 'sent', sent_at = $2
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(order_id = %order_id, user_id = %user_id, "Order sent");
        Ok(order)
    }

    /// Cancel an order.
    ///
    /// The alert it answered goes back to `active` unless another open order
    /// still covers it.
    pub async fn cancel_order(&self, order_id: Uuid, user_id: Uuid) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;
        let current = lock_order(&mut tx, order_id).await?;
        ensure_transition(current.status, OrderStatus::Cancelled)?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders SET status = 'cancelled'
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(alert_id) = order.alert_id {
            let alert = lock_alert(&mut tx, alert_id).await?;
            let still_covered = sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM orders
                    WHERE alert_id = $1 AND id <> $2 AND status IN ('pending', 'sent')
                )
                "#,
            )
            .bind(alert_id)
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;

            if alert.status == AlertStatus::OrderSent && !still_covered {
                sqlx::query(
                    "UPDATE alerts SET status = 'active', updated_at = NOW() WHERE id = $1",
                )
                .bind(alert_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        tracing::info!(order_id = %order_id, user_id = %user_id, "Order cancelled");
        Ok(order)
    }

    /// Receive an order, booking the delivery as a stock entry
    pub async fn receive_order(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        input: ReceiveOrderInput,
    ) -> AppResult<ReceivedOrder> {
        let current = self.get_order(order_id).await?;
        ensure_transition(current.status, OrderStatus::Received)?;

        let receipt = self
            .inventory
            .record_entry(
                user_id,
                RecordEntryInput {
                    product_id: current.product_id,
                    warehouse_id: input.warehouse_id,
                    lot: input.lot,
                    quantity: input.quantity.unwrap_or(current.quantity),
                    min_stock: None,
                    supplier_id: Some(current.supplier_id),
                    order_id: Some(order_id),
                    unit_cost: input.unit_cost,
                    notes: input.notes,
                },
            )
            .await?;

        let order = self.get_order(order_id).await?;
        Ok(ReceivedOrder { order, receipt })
    }
}

fn ensure_transition(current: OrderStatus, next: OrderStatus) -> AppResult<()> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::InvalidStateTransition(format!(
            "Cannot move order from {} to {}",
            current.as_str(),
            next.as_str()
        )))
    }
}

async fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Order> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Order".to_string()))
}

async fn ensure_active_supplier(conn: &mut PgConnection, supplier_id: Uuid) -> AppResult<()> {
    let is_active =
        sqlx::query_scalar::<_, bool>("SELECT is_active FROM suppliers WHERE id = $1")
            .bind(supplier_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

    if is_active {
        Ok(())
    } else {
        Err(AppError::Inactive("Supplier".to_string()))
    }
}
