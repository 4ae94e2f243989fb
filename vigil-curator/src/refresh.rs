//! Refresh scheduler: fixed-interval change detection on the alert directory
//!
//! Compares the number of directory entries against the previous poll and
//! broadcasts `AlertsChanged` when it differs. This is a coarse liveness
//! signal: it cannot tell one new file from a completed triple-set, and a
//! consumer reacting to it always re-scans through the store.

use chrono::Utc;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vigil_common::events::{CurationEvent, EventBus};
use vigil_common::fs_utils::count_entries;

/// Entry count moved between two polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountChange {
    pub previous: usize,
    pub current: usize,
}

pub struct RefreshScheduler {
    alerts_dir: PathBuf,
    interval: Duration,
    last_count: Option<usize>,
}

impl RefreshScheduler {
    pub fn new(alerts_dir: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            alerts_dir: alerts_dir.into(),
            interval,
            last_count: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Count entries once. The first successful poll only records a baseline.
    pub async fn poll_once(&mut self) -> io::Result<Option<CountChange>> {
        let current = count_entries(&self.alerts_dir).await?;
        let previous = self.last_count.replace(current);

        Ok(match previous {
            Some(previous) if previous != current => Some(CountChange { previous, current }),
            _ => None,
        })
    }

    /// Poll until `cancel` fires, emitting `AlertsChanged` on every change
    pub async fn run(mut self, event_bus: EventBus, cancel: CancellationToken) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Refresh scheduler started ({}ms interval) on {}",
            self.interval.as_millis(),
            self.alerts_dir.display()
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Refresh scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(Some(change)) => {
                            debug!(
                                "Alert directory changed: {} -> {} entries",
                                change.previous, change.current
                            );
                            event_bus.emit_lossy(CurationEvent::AlertsChanged {
                                entry_count: change.current,
                                previous_count: change.previous,
                                timestamp: Utc::now(),
                            });
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(
                                "Failed to poll {}: {}",
                                self.alerts_dir.display(),
                                e
                            );
                        }
                    }
                }
            }
        }
    }
}
