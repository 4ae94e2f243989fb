//! Action processor: apply a reviewer decision to the filesystem
//!
//! | Decision  | clean artifact              | annotation artifact          |
//! |-----------|-----------------------------|------------------------------|
//! | confirm   | → true_alarms/images/       | → true_alarms/labels/        |
//! | dismiss   | → false_alarms/images/      | deleted                      |
//!
//! The display artifact is never touched. The annotation step runs first and
//! the clean artifact moves last, because the clean artifact's presence is what
//! marks an alert PENDING: if any step fails, the clean artifact is still in
//! the alert directory and the reviewer can retry. A source that is already
//! gone is a no-op, so repeating a decision is safe. History and stats change
//! only after every file step has succeeded.

use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};
use vigil_common::fs_utils::{move_file, remove_if_exists};
use vigil_common::{AlertStatus, DataLayout, TripleSet};

use crate::error::{CurationError, CurationResult};
use crate::history::Decision;
use crate::ledger::{SharedLedger, Stats};

/// Outcome of a decision
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DecisionAck {
    pub alert_id: String,
    pub status: AlertStatus,
    /// Clean artifact was moved by this call
    pub clean_moved: bool,
    /// Annotation artifact was moved (confirm) or deleted (dismiss) by this call
    pub annotation_handled: bool,
    /// Nothing left to move: the alert had already been processed
    pub already_processed: bool,
}

/// Outcome of an alert directory purge
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PurgeReport {
    pub removed: usize,
    pub failed: usize,
}

/// Write side of the curation pipeline
#[derive(Clone)]
pub struct ActionProcessor {
    layout: DataLayout,
    ledger: SharedLedger,
}

impl ActionProcessor {
    pub fn new(layout: DataLayout, ledger: SharedLedger) -> Self {
        Self { layout, ledger }
    }

    /// Apply a CONFIRM (`is_threat`) or DISMISS decision.
    ///
    /// `display_path` must name the alert's display artifact inside the alert
    /// directory. Counters only move when this call relocated or deleted
    /// something, so a repeated decision leaves stats unchanged. When nothing
    /// moved and history already holds a decision for the alert, that decision
    /// stands and is reported back.
    pub async fn decide(
        &self,
        alert_id: &str,
        is_threat: bool,
        display_path: &Path,
    ) -> CurationResult<DecisionAck> {
        let triple = self.resolve_triple(alert_id, display_path).await?;
        let decision = Decision::from_is_threat(is_threat);

        let alerts_dir = self.layout.alerts_dir();
        let clean = triple.clean_path(&alerts_dir);
        let annotation = triple.annotation_path(&alerts_dir);

        let mut ledger = self.ledger.lock().await;

        let (clean_moved, annotation_handled) = match decision {
            Decision::Confirmed => {
                let label_dst = self.layout.true_labels_dir().join(triple.annotation_name());
                let label_moved = move_file(&annotation, &label_dst)
                    .await
                    .map_err(|e| CurationError::io(&annotation, e))?;

                let clean_dst = self.layout.true_images_dir().join(triple.clean_name());
                let clean_moved = move_file(&clean, &clean_dst)
                    .await
                    .map_err(|e| CurationError::io(&clean, e))?;

                (clean_moved, label_moved)
            }
            Decision::Dismissed => {
                // A dismissed alert's geometry is not trusted; drop it
                let label_removed = remove_if_exists(&annotation)
                    .await
                    .map_err(|e| CurationError::io(&annotation, e))?;

                let clean_dst = self.layout.false_images_dir().join(triple.clean_name());
                let clean_moved = move_file(&clean, &clean_dst)
                    .await
                    .map_err(|e| CurationError::io(&clean, e))?;

                (clean_moved, label_removed)
            }
        };

        let changed = clean_moved || annotation_handled;
        let prior = ledger.history.get(triple.base_id());

        // A no-op repeat keeps the decision that actually moved the files
        let effective = match prior {
            Some(prior) if !changed => prior,
            _ => {
                if changed {
                    ledger.stats.count(decision);
                }
                // Files have already moved; a failed log append only loses durability
                if let Err(e) = ledger.history.record(triple.base_id(), decision).await {
                    warn!("Decision for {} not persisted: {}", alert_id, e);
                }
                decision
            }
        };

        info!(
            alert_id = %alert_id,
            status = %effective.status(),
            clean_moved,
            annotation_handled,
            "Decision applied"
        );

        Ok(DecisionAck {
            alert_id: alert_id.to_string(),
            status: effective.status(),
            clean_moved,
            annotation_handled,
            already_processed: !changed,
        })
    }

    /// Snapshot of the review counters
    pub async fn stats(&self) -> Stats {
        self.ledger.lock().await.stats
    }

    /// Clear history and counters together.
    ///
    /// Alerts decided before the reset report ARCHIVED afterwards.
    pub async fn reset(&self) -> CurationResult<()> {
        let mut ledger = self.ledger.lock().await;
        ledger.stats = Stats::default();
        ledger
            .history
            .clear()
            .await
            .map_err(|e| CurationError::io(self.layout.history_log_path(), e))?;
        info!("Decision history and stats reset");
        Ok(())
    }

    /// Delete every file in the alert directory, pending or not.
    ///
    /// Dataset partitions are left alone. Failures are counted, not fatal.
    pub async fn purge_alerts(&self) -> CurationResult<PurgeReport> {
        let alerts_dir = self.layout.alerts_dir();
        let _ledger = self.ledger.lock().await;

        let mut entries = tokio::fs::read_dir(&alerts_dir)
            .await
            .map_err(|e| CurationError::io(&alerts_dir, e))?;

        let mut report = PurgeReport::default();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CurationError::io(&alerts_dir, e))?
        {
            let path = entry.path();
            match entry.file_type().await {
                Ok(file_type) if file_type.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!("Cannot stat {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            }

            match remove_if_exists(&path).await {
                Ok(true) => report.removed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to remove {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }

        info!(
            removed = report.removed,
            failed = report.failed,
            "Alert directory purged"
        );
        Ok(report)
    }

    /// Check the display path belongs to this alert and this alert directory
    async fn resolve_triple(&self, alert_id: &str, display_path: &Path) -> CurationResult<TripleSet> {
        let triple = TripleSet::from_display_path(display_path)
            .map_err(|e| CurationError::MalformedArtifactName(e.to_string()))?
            .ok_or_else(|| {
                CurationError::InvalidDecision(format!(
                    "not a display artifact: {}",
                    display_path.display()
                ))
            })?;

        if triple.base_id() != alert_id {
            return Err(CurationError::InvalidDecision(format!(
                "display artifact {} does not belong to alert {}",
                display_path.display(),
                alert_id
            )));
        }

        let alerts_dir = self.layout.alerts_dir();
        let parent = display_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let parent = tokio::fs::canonicalize(parent)
            .await
            .map_err(|e| CurationError::io(parent, e))?;
        let expected = tokio::fs::canonicalize(&alerts_dir)
            .await
            .map_err(|e| CurationError::io(&alerts_dir, e))?;
        if parent != expected {
            return Err(CurationError::InvalidDecision(format!(
                "{} is outside the alert directory",
                display_path.display()
            )));
        }

        Ok(triple)
    }
}
