//! Review counters and history reset

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use vigil_common::events::CurationEvent;

use crate::error::ApiResult;
use crate::ledger::Stats;
use crate::store::CurationSummary;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Decisions that moved files since startup or the last reset
    pub stats: Stats,
    /// Fresh scan of the alert directory and dataset partitions
    pub summary: CurationSummary,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub stats: Stats,
}

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let summary = state.store.summary().await?;
    let stats = state.actions.stats().await;
    Ok(Json(StatsResponse { stats, summary }))
}

/// POST /api/reset
///
/// Clears counters and decision history. Files are not touched, so alerts
/// decided earlier report ARCHIVED from now on.
pub async fn reset(State(state): State<AppState>) -> ApiResult<Json<ResetResponse>> {
    state.actions.reset().await?;
    state
        .event_bus
        .emit_lossy(CurationEvent::HistoryReset { timestamp: Utc::now() });

    Ok(Json(ResetResponse {
        stats: state.actions.stats().await,
    }))
}

pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stats", get(get_stats))
        .route("/api/reset", post(reset))
}
