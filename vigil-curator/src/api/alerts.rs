//! Alert listing and reviewer decision endpoints
//!
//! - GET  /api/alerts?status=pending
//! - GET  /api/alerts/:id/annotations
//! - POST /api/alerts/:id/decision   `{"is_threat": true}`
//! - POST /api/alerts/purge

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use vigil_common::events::CurationEvent;
use vigil_common::triple::LabelLine;
use vigil_common::AlertStatus;

use crate::actions::{DecisionAck, PurgeReport};
use crate::error::{ApiError, ApiResult, CurationError};
use crate::store::{validate_alert_id, AlertRecord};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    /// Only return alerts with this status
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AlertListResponse {
    pub alerts: Vec<AlertRecord>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct AnnotationResponse {
    pub alert_id: String,
    pub boxes: Vec<LabelLine>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub is_threat: bool,
}

/// GET /api/alerts
///
/// Newest first. Unknown `status` values are rejected with 400.
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
) -> ApiResult<Json<AlertListResponse>> {
    let filter = query
        .status
        .as_deref()
        .map(str::parse::<AlertStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let alerts: Vec<AlertRecord> = state
        .store
        .list_alerts()
        .await?
        .into_iter()
        .filter(|record| filter.map_or(true, |status| record.status == status))
        .collect();

    Ok(Json(AlertListResponse {
        total: alerts.len(),
        alerts,
    }))
}

/// GET /api/alerts/:id/annotations
pub async fn get_annotations(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
) -> ApiResult<Json<AnnotationResponse>> {
    let boxes = state.store.read_annotations(&alert_id).await?;
    Ok(Json(AnnotationResponse { alert_id, boxes }))
}

/// POST /api/alerts/:id/decision
///
/// The alert must still have a display artifact. Deciding an alert that was
/// already processed succeeds with `already_processed: true` and moves nothing.
pub async fn decide_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> ApiResult<Json<DecisionAck>> {
    validate_alert_id(&alert_id)?;

    let record = state
        .store
        .find_alert(&alert_id)
        .await?
        .ok_or_else(|| CurationError::AlertNotFound(alert_id.clone()))?;

    let ack = state
        .actions
        .decide(&alert_id, request.is_threat, &record.display_path)
        .await?;

    state.event_bus.emit_lossy(CurationEvent::AlertDecided {
        alert_id: ack.alert_id.clone(),
        status: ack.status,
        timestamp: Utc::now(),
    });

    Ok(Json(ack))
}

/// POST /api/alerts/purge
///
/// Removes every file in the alert directory. Dataset partitions are kept.
pub async fn purge_alerts(State(state): State<AppState>) -> ApiResult<Json<PurgeReport>> {
    let report = state.actions.purge_alerts().await?;
    info!("Purge requested via API: {} files removed", report.removed);

    state.event_bus.emit_lossy(CurationEvent::AlertsPurged {
        removed: report.removed,
        timestamp: Utc::now(),
    });

    Ok(Json(report))
}

/// Build alert routes
pub fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/purge", post(purge_alerts))
        .route("/api/alerts/:id/annotations", get(get_annotations))
        .route("/api/alerts/:id/decision", post(decide_alert))
        .route("/api/events", get(crate::api::event_stream))
}
