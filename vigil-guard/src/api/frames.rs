//! Frame ingest and producer status
//!
//! **Request:** `POST /api/frames`
//! ```json
//! {"format": "jpg", "image": "<base64>", "annotated": "<base64>",
//!  "detections": [{"class_index": 0, "confidence": 0.91,
//!                  "cx": 0.5, "cy": 0.4, "w": 0.2, "h": 0.3}]}
//! ```
//! `annotated` is optional; without it the raw frame doubles as the display
//! artifact.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vigil_common::{BoundingBox, Detection};

use crate::detector::{Frame, ReportedDetections};
use crate::error::{ApiError, ApiResult};
use crate::producer::EmitResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportedDetection {
    pub class_index: u32,
    pub confidence: f32,
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

impl From<&ReportedDetection> for Detection {
    fn from(d: &ReportedDetection) -> Self {
        Detection::new(d.class_index, d.confidence, BoundingBox::new(d.cx, d.cy, d.w, d.h))
    }
}

#[derive(Debug, Deserialize)]
pub struct FrameRequest {
    /// Image extension; the configured default when omitted
    #[serde(default)]
    pub format: String,
    pub image: String,
    #[serde(default)]
    pub annotated: Option<String>,
    #[serde(default)]
    pub detections: Vec<ReportedDetection>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub confidence_threshold: f32,
    pub cooldown_secs: f64,
    pub image_extension: String,
    pub source_tag: String,
    pub alerts_dir: String,
    pub last_emission: Option<DateTime<Utc>>,
    pub emitted_count: u64,
}

fn decode(field: &str, value: &str) -> ApiResult<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| ApiError::BadRequest(format!("{} is not valid base64: {}", field, e)))
}

/// POST /api/frames
pub async fn submit_frame(
    State(state): State<AppState>,
    Json(request): Json<FrameRequest>,
) -> ApiResult<Json<EmitResult>> {
    let image = decode("image", &request.image)?;
    if image.is_empty() {
        return Err(ApiError::BadRequest("image is empty".to_string()));
    }
    let annotated = request
        .annotated
        .as_deref()
        .map(|value| decode("annotated", value))
        .transpose()?;

    let detections = request.detections.iter().map(Detection::from).collect();
    let detector = ReportedDetections::new(detections, annotated)?;
    let frame = Frame::new(image, request.format);

    let mut producer = state.producer.lock().await;
    let result = producer.evaluate(&frame, &detector).await?;
    Ok(Json(result))
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let producer = state.producer.lock().await;
    let config = producer.config();

    Json(StatusResponse {
        confidence_threshold: config.confidence_threshold,
        cooldown_secs: config.cooldown.as_secs_f64(),
        image_extension: config.image_extension.clone(),
        source_tag: config.source_tag.clone(),
        alerts_dir: producer.alerts_dir().display().to_string(),
        last_emission: producer.last_emission(),
        emitted_count: producer.emitted_count(),
    })
}

pub fn frame_routes() -> Router<AppState> {
    Router::new()
        .route("/api/frames", post(submit_frame))
        .route("/api/status", get(get_status))
}
