//! HTTP handlers for replenishment order endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Order, PaginatedResponse};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::order::{
    CreateOrderInput, OrderQuery, OrderService, ReceiveOrderInput, ReceivedOrder,
};
use crate::AppState;

fn order_service(state: AppState) -> OrderService {
    let inventory = state.inventory_service();
    OrderService::new(state.db, inventory)
}

/// Place an order
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<Order>)> {
    current_user.0.require_elevated()?;
    let order = order_service(state)
        .create_order(current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// List orders
pub async fn list_orders(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<OrderQuery>,
) -> AppResult<Json<PaginatedResponse<Order>>> {
    Ok(Json(order_service(state).list_orders(query).await?))
}

/// Get an order
pub async fn get_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    Ok(Json(order_service(state).get_order(order_id).await?))
}

/// Mark an order as sent
pub async fn send_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    current_user.0.require_elevated()?;
    let order = order_service(state)
        .mark_sent(order_id, current_user.0.user_id)
        .await?;
    Ok(Json(order))
}

/// Cancel an order
pub async fn cancel_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    current_user.0.require_elevated()?;
    let order = order_service(state)
        .cancel_order(order_id, current_user.0.user_id)
        .await?;
    Ok(Json(order))
}

/// Receive an order into stock
pub async fn receive_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<ReceiveOrderInput>,
) -> AppResult<Json<ReceivedOrder>> {
    current_user.0.require_elevated()?;
    let received = order_service(state)
        .receive_order(order_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(received))
}
