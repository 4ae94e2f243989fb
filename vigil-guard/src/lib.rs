//! vigil-guard library - detection producer
//!
//! Receives frames and detector output from the inference process and writes
//! alert triple-sets into the alert directory for vigil-curator to review.

pub mod api;
pub mod detector;
pub mod error;
pub mod producer;

pub use crate::detector::{Detector, Frame, ReportedDetections};
pub use crate::error::{ApiError, ApiResult, ProducerError, ProducerResult};
pub use crate::producer::{DetectionProducer, EmitResult, ProducerConfig, SuppressReason};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Frames are evaluated one at a time so the cooldown sees every emission
    pub producer: Arc<Mutex<DetectionProducer>>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(producer: DetectionProducer) -> Self {
        Self {
            producer: Arc::new(Mutex::new(producer)),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::frame_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
