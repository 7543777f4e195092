//! HTTP handlers for stock ledger endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{PaginatedResponse, StockEntry, StockOutput};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::inventory::{
    EntryResult, InventoryQuery, InventoryView, MovementQuery, OutputResult, RecordEntryInput,
    RecordOutputInput, ThresholdResult, UpdateThresholdInput,
};
use crate::AppState;

/// List ledger rows
pub async fn list_inventory(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<InventoryQuery>,
) -> AppResult<Json<PaginatedResponse<InventoryView>>> {
    let service = state.inventory_service();
    Ok(Json(service.list_inventory(query).await?))
}

/// Get a ledger row
pub async fn get_inventory(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
) -> AppResult<Json<InventoryView>> {
    let service = state.inventory_service();
    Ok(Json(service.get_inventory(inventory_id).await?))
}

/// Change a ledger row's minimum threshold
pub async fn update_threshold(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
    Json(input): Json<UpdateThresholdInput>,
) -> AppResult<Json<ThresholdResult>> {
    current_user.0.require_elevated()?;
    let service = state.inventory_service();
    let result = service
        .update_threshold(inventory_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(result))
}

/// Record inbound stock
pub async fn record_entry(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordEntryInput>,
) -> AppResult<(StatusCode, Json<EntryResult>)> {
    current_user.0.require_elevated()?;
    let service = state.inventory_service();
    let result = service.record_entry(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// List entries
pub async fn list_entries(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<MovementQuery>,
) -> AppResult<Json<PaginatedResponse<StockEntry>>> {
    let service = state.inventory_service();
    Ok(Json(service.list_entries(query).await?))
}

/// Record outbound stock
pub async fn record_output(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordOutputInput>,
) -> AppResult<(StatusCode, Json<OutputResult>)> {
    current_user.0.require_elevated()?;
    let service = state.inventory_service();
    let result = service.record_output(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// List outputs
pub async fn list_outputs(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<MovementQuery>,
) -> AppResult<Json<PaginatedResponse<StockOutput>>> {
    let service = state.inventory_service();
    Ok(Json(service.list_outputs(query).await?))
}
