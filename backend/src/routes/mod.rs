//! Route definitions for the Stockroom API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes; everything below `/api/v1` requires a bearer token
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/warehouses", warehouse_routes())
        .nest("/inventory", inventory_routes())
        .route(
            "/entries",
            get(handlers::list_entries).post(handlers::record_entry),
        )
        .route(
            "/outputs",
            get(handlers::list_outputs).post(handlers::record_output),
        )
        .nest("/alerts", alert_routes())
        .nest("/orders", order_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Product catalog routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::deactivate_product),
        )
}

/// Supplier routes
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers).post(handlers::create_supplier))
        .route(
            "/:supplier_id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::deactivate_supplier),
        )
}

/// Warehouse routes
fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_warehouses).post(handlers::create_warehouse))
        .route(
            "/:warehouse_id",
            get(handlers::get_warehouse)
                .put(handlers::update_warehouse)
                .delete(handlers::deactivate_warehouse),
        )
}

/// Stock ledger routes
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_inventory))
        .route("/:inventory_id", get(handlers::get_inventory))
        .route("/:inventory_id/threshold", put(handlers::update_threshold))
}

/// Alert routes
fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_alerts))
        .route("/:alert_id", get(handlers::get_alert))
        .route("/:alert_id/acknowledge", post(handlers::acknowledge_alert))
        .route("/:alert_id/resolve", post(handlers::resolve_alert))
}

/// Replenishment order routes
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/send", post(handlers::send_order))
        .route("/:order_id/cancel", post(handlers::cancel_order))
        .route("/:order_id/receive", post(handlers::receive_order))
}
