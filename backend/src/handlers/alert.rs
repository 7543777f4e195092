//! HTTP handlers for stock alert endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{Alert, PaginatedResponse};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::alert::{AlertQuery, AlertService, ResolveAlertInput};
use crate::AppState;

/// List alerts
pub async fn list_alerts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<AlertQuery>,
) -> AppResult<Json<PaginatedResponse<Alert>>> {
    let service = AlertService::new(state.db);
    Ok(Json(service.list_alerts(query).await?))
}

/// Get an alert
pub async fn get_alert(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<Alert>> {
    let service = AlertService::new(state.db);
    Ok(Json(service.get_alert(alert_id).await?))
}

/// Acknowledge a new alert
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<Alert>> {
    current_user.0.require_elevated()?;
    let service = AlertService::new(state.db);
    let alert = service.acknowledge(alert_id).await?;
    tracing::debug!(alert_id = %alert_id, user_id = %current_user.0.user_id, "Acknowledged via API");
    Ok(Json(alert))
}

/// Resolve an alert by hand
pub async fn resolve_alert(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
    Json(input): Json<ResolveAlertInput>,
) -> AppResult<Json<Alert>> {
    current_user.0.require_elevated()?;
    let service = AlertService::new(state.db);
    let alert = service
        .resolve_manually(alert_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(alert))
}
