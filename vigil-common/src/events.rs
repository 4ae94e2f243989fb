//! Event types and EventBus
//!
//! Events are broadcast in-process and forwarded to SSE clients so a review UI
//! can re-scan without polling the HTTP API itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::triple::AlertStatus;

/// Vigil event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum CurationEvent {
    /// The alert directory entry count changed since the previous poll
    AlertsChanged {
        entry_count: usize,
        previous_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A reviewer decision was applied
    AlertDecided {
        alert_id: String,
        status: AlertStatus,
        timestamp: DateTime<Utc>,
    },

    /// Process-local history and stats were cleared
    HistoryReset { timestamp: DateTime<Utc> },

    /// Operator removed every file from the alert directory
    AlertsPurged {
        removed: usize,
        timestamp: DateTime<Utc>,
    },
}

impl CurationEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            CurationEvent::AlertsChanged { .. } => "AlertsChanged",
            CurationEvent::AlertDecided { .. } => "AlertDecided",
            CurationEvent::HistoryReset { .. } => "HistoryReset",
            CurationEvent::AlertsPurged { .. } => "AlertsPurged",
        }
    }
}

/// Central event distribution bus
///
/// Wraps `tokio::sync::broadcast`: publishing never blocks, slow subscribers
/// observe `Lagged` and skip ahead.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CurationEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<CurationEvent> {
        self.tx.subscribe()
    }

    /// Emit an event. Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CurationEvent,
    ) -> Result<usize, broadcast::error::SendError<CurationEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CurationEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
