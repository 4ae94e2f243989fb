//! Curation store: scan the alert directory and derive alert statuses
//!
//! There is no stored alert index. Every call re-lists the directory and
//! classifies each display artifact:
//!
//! 1. clean artifact present → PENDING
//! 2. otherwise, decision in history → CONFIRMED / DISMISSED
//! 3. otherwise → ARCHIVED (decided in an earlier lifetime, or history reset)

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use vigil_common::fs_utils::count_files;
use vigil_common::triple::{parse_annotation, LabelLine, ANNOTATION_EXTENSION};
use vigil_common::{AlertStatus, DataLayout, TripleSet};

use crate::error::{CurationError, CurationResult};
use crate::ledger::{Ledger, SharedLedger};

/// One alert as derived from disk plus history
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlertRecord {
    pub id: String,
    /// Display artifact modification time
    pub created_at: DateTime<Utc>,
    pub source_tag: String,
    pub display_path: PathBuf,
    /// File name of the display artifact, relative to the alert directory
    pub display_name: String,
    pub status: AlertStatus,
}

/// Counts for a reviewer dashboard
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CurationSummary {
    pub pending: usize,
    pub confirmed: usize,
    pub dismissed: usize,
    pub archived: usize,
    /// Files in the true-positive image partition
    pub true_images: usize,
    /// Files in the true-positive label partition
    pub true_labels: usize,
    /// Files in the false-positive image partition
    pub false_images: usize,
}

struct Candidate {
    triple: TripleSet,
    path: PathBuf,
    modified: SystemTime,
}

/// Read side of the curation pipeline
#[derive(Clone)]
pub struct CurationStore {
    layout: DataLayout,
    ledger: SharedLedger,
}

impl CurationStore {
    pub fn new(layout: DataLayout, ledger: SharedLedger) -> Self {
        Self { layout, ledger }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// All alerts with a display artifact, newest first.
    ///
    /// Ties in modification time keep directory order, which is unspecified.
    pub async fn list_alerts(&self) -> CurationResult<Vec<AlertRecord>> {
        let alerts_dir = self.layout.alerts_dir();
        let mut candidates = scan_display_artifacts(&alerts_dir).await?;
        candidates.sort_by(|a, b| b.modified.cmp(&a.modified));

        // Hold the ledger while probing so a decision in flight is seen
        // either entirely before or entirely after this scan.
        let ledger = self.ledger.lock().await;

        let mut records = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let status = derive_status(&alerts_dir, &candidate.triple, &ledger).await?;
            records.push(AlertRecord {
                id: candidate.triple.base_id().to_string(),
                created_at: DateTime::<Utc>::from(candidate.modified),
                source_tag: candidate.triple.source_tag().to_string(),
                display_name: candidate.triple.display_name(),
                display_path: candidate.path,
                status,
            });
        }

        debug!("Scan found {} alerts in {}", records.len(), alerts_dir.display());
        Ok(records)
    }

    /// Look up a single alert by id
    pub async fn find_alert(&self, alert_id: &str) -> CurationResult<Option<AlertRecord>> {
        Ok(self
            .list_alerts()
            .await?
            .into_iter()
            .find(|record| record.id == alert_id))
    }

    /// Parsed geometry of a pending alert's annotation artifact
    pub async fn read_annotations(&self, alert_id: &str) -> CurationResult<Vec<LabelLine>> {
        validate_alert_id(alert_id)?;
        let path = self
            .layout
            .alerts_dir()
            .join(format!("{}.{}", alert_id, ANNOTATION_EXTENSION));

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CurationError::AlertNotFound(alert_id.to_string()));
            }
            Err(e) => return Err(CurationError::io(&path, e)),
        };

        parse_annotation(&content).map_err(|e| CurationError::MalformedAnnotation {
            alert_id: alert_id.to_string(),
            reason: e.to_string(),
        })
    }

    /// Status counts from a fresh scan plus partition file counts
    pub async fn summary(&self) -> CurationResult<CurationSummary> {
        let mut summary = CurationSummary::default();
        for record in self.list_alerts().await? {
            match record.status {
                AlertStatus::Pending => summary.pending += 1,
                AlertStatus::Confirmed => summary.confirmed += 1,
                AlertStatus::Dismissed => summary.dismissed += 1,
                AlertStatus::Archived => summary.archived += 1,
            }
        }

        let true_images = self.layout.true_images_dir();
        let true_labels = self.layout.true_labels_dir();
        let false_images = self.layout.false_images_dir();
        summary.true_images = count_files(&true_images)
            .await
            .map_err(|e| CurationError::io(&true_images, e))?;
        summary.true_labels = count_files(&true_labels)
            .await
            .map_err(|e| CurationError::io(&true_labels, e))?;
        summary.false_images = count_files(&false_images)
            .await
            .map_err(|e| CurationError::io(&false_images, e))?;

        Ok(summary)
    }
}

/// Reject ids that could escape the alert directory
pub(crate) fn validate_alert_id(alert_id: &str) -> CurationResult<TripleSet> {
    TripleSet::new(alert_id, vigil_common::config::DEFAULT_IMAGE_EXTENSION)
        .map_err(|e| CurationError::MalformedArtifactName(e.to_string()))
}

async fn derive_status(
    alerts_dir: &Path,
    triple: &TripleSet,
    ledger: &Ledger,
) -> CurationResult<AlertStatus> {
    let clean_path = triple.clean_path(alerts_dir);
    let clean_exists = tokio::fs::try_exists(&clean_path)
        .await
        .map_err(|e| CurationError::io(&clean_path, e))?;

    if clean_exists {
        return Ok(AlertStatus::Pending);
    }

    Ok(ledger
        .history
        .get(triple.base_id())
        .map(|decision| decision.status())
        .unwrap_or(AlertStatus::Archived))
}

async fn scan_display_artifacts(alerts_dir: &Path) -> CurationResult<Vec<Candidate>> {
    let mut entries = tokio::fs::read_dir(alerts_dir)
        .await
        .map_err(|e| CurationError::io(alerts_dir, e))?;

    let mut candidates = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => return Err(CurationError::io(alerts_dir, e)),
        };

        let path = entry.path();
        let triple = match TripleSet::from_display_path(&path) {
            Ok(Some(triple)) => triple,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping alert artifact: {}", e);
                continue;
            }
        };

        // The producer or a purge may remove files between listing and stat
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(CurationError::io(&path, e)),
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                warn!("No modification time for {}: {}", path.display(), e);
                SystemTime::UNIX_EPOCH
            }
        };

        candidates.push(Candidate {
            triple,
            path,
            modified,
        });
    }

    Ok(candidates)
}
