//! Server-Sent Events (SSE) for review UIs
//!
//! Streams AlertsChanged, AlertDecided, HistoryReset and AlertsPurged.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /api/events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    vigil_common::sse::create_event_sse_stream("vigil-curator", &state.event_bus)
}
