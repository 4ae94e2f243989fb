//! vigil-curator library - alert review and dataset curation
//!
//! Reads the alert directory written by vigil-guard, derives each alert's
//! review status, and moves training artifacts into dataset partitions when
//! a reviewer confirms or dismisses an alert.

pub mod actions;
pub mod api;
pub mod error;
pub mod history;
pub mod ledger;
pub mod refresh;
pub mod store;

pub use crate::actions::{ActionProcessor, DecisionAck, PurgeReport};
pub use crate::error::{ApiError, ApiResult, CurationError, CurationResult};
pub use crate::history::{Decision, HistoryLog, ProcessLocalHistory};
pub use crate::ledger::{Ledger, SharedLedger, Stats};
pub use crate::store::{AlertRecord, CurationStore, CurationSummary};

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use vigil_common::events::EventBus;
use vigil_common::DataLayout;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub layout: DataLayout,
    pub store: CurationStore,
    pub actions: ActionProcessor,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Build store and action processor around one shared ledger
    pub fn new(layout: DataLayout, history: ProcessLocalHistory, event_bus: EventBus) -> Self {
        let ledger = ledger::shared(Ledger::new(history));
        Self {
            store: CurationStore::new(layout.clone(), ledger.clone()),
            actions: ActionProcessor::new(layout.clone(), ledger),
            layout,
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let artifacts = ServeDir::new(state.layout.alerts_dir());

    Router::new()
        .merge(api::alert_routes())
        .merge(api::stats_routes())
        .merge(api::health_routes())
        .nest_service("/artifacts", artifacts)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
