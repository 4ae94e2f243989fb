//! Data root layout
//!
//! ```text
//! <root>/
//!   alerts/                               triple-sets awaiting (or after) review
//!   training_data/true_alarms/images/     confirmed clean images
//!   training_data/true_alarms/labels/     confirmed annotations
//!   training_data/false_alarms/images/    dismissed clean images (negatives)
//!   curation_history.jsonl                optional decision log
//! ```

use std::path::{Path, PathBuf};
use tracing::info;

use crate::Result;

pub const ALERTS_DIR: &str = "alerts";
pub const TRAINING_DIR: &str = "training_data";
pub const HISTORY_LOG_FILE: &str = "curation_history.jsonl";

/// Paths of the alert directory and dataset partitions under one data root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shared directory the producer writes triple-sets into
    pub fn alerts_dir(&self) -> PathBuf {
        self.root.join(ALERTS_DIR)
    }

    pub fn training_dir(&self) -> PathBuf {
        self.root.join(TRAINING_DIR)
    }

    /// Confirmed clean images
    pub fn true_images_dir(&self) -> PathBuf {
        self.training_dir().join("true_alarms").join("images")
    }

    /// Confirmed annotations
    pub fn true_labels_dir(&self) -> PathBuf {
        self.training_dir().join("true_alarms").join("labels")
    }

    /// Dismissed clean images kept as negative exemplars
    pub fn false_images_dir(&self) -> PathBuf {
        self.training_dir().join("false_alarms").join("images")
    }

    pub fn history_log_path(&self) -> PathBuf {
        self.root.join(HISTORY_LOG_FILE)
    }

    /// Create the alert directory and every partition directory
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            self.alerts_dir(),
            self.true_images_dir(),
            self.true_labels_dir(),
            self.false_images_dir(),
        ] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                info!("Created directory: {}", dir.display());
            }
        }
        Ok(())
    }
}
