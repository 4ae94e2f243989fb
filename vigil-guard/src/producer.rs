//! Detection producer: turn accepted detections into alert triple-sets
//!
//! Each frame is filtered by confidence. A non-empty result emits one
//! triple-set unless the previous emission was within the cooldown, so a
//! burst of detections collapses to a single alert.
//!
//! Artifacts are written clean first, then annotation, then display. The
//! display artifact is what the curator scans for, so an alert only becomes
//! visible once its siblings are already in place.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use vigil_common::config::{
    GuardConfig, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_COOLDOWN_SECS, DEFAULT_IMAGE_EXTENSION,
    DEFAULT_SOURCE_TAG,
};
use vigil_common::fs_utils::write_atomic;
use vigil_common::triple::{format_annotation, is_image_extension};
use vigil_common::{Detection, TripleSet};

use crate::detector::{Detector, Frame};
use crate::error::{ProducerError, ProducerResult};

/// Timestamp part of an alert id; millisecond precision keeps sub-second
/// cooldowns from colliding
const ID_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S-%3f";

#[derive(Debug, Clone, PartialEq)]
pub struct ProducerConfig {
    pub confidence_threshold: f32,
    pub cooldown: Duration,
    /// Used when a frame does not name its own format
    pub image_extension: String,
    pub source_tag: String,
}

impl TryFrom<&GuardConfig> for ProducerConfig {
    type Error = vigil_common::Error;

    fn try_from(config: &GuardConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            confidence_threshold: config.confidence_threshold,
            cooldown: config.cooldown()?,
            image_extension: config.image_extension.clone(),
            source_tag: config.source_tag.clone(),
        })
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            cooldown: Duration::from_secs_f64(DEFAULT_COOLDOWN_SECS),
            image_extension: DEFAULT_IMAGE_EXTENSION.to_string(),
            source_tag: DEFAULT_SOURCE_TAG.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    /// Nothing at or above the confidence threshold
    NoDetections,
    /// Previous alert is too recent
    Cooldown,
}

/// What happened to one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EmitResult {
    Emitted {
        base_id: String,
        detections: Vec<Detection>,
    },
    Suppressed {
        reason: SuppressReason,
    },
}

impl EmitResult {
    pub fn is_emitted(&self) -> bool {
        matches!(self, EmitResult::Emitted { .. })
    }
}

pub struct DetectionProducer {
    config: ProducerConfig,
    alerts_dir: PathBuf,
    last_emission: Option<DateTime<Utc>>,
    emitted_count: u64,
}

impl DetectionProducer {
    pub fn new(config: ProducerConfig, alerts_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            alerts_dir: alerts_dir.into(),
            last_emission: None,
            emitted_count: 0,
        }
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    pub fn alerts_dir(&self) -> &Path {
        &self.alerts_dir
    }

    pub fn last_emission(&self) -> Option<DateTime<Utc>> {
        self.last_emission
    }

    pub fn emitted_count(&self) -> u64 {
        self.emitted_count
    }

    /// Evaluate a frame against the wall clock
    pub async fn evaluate(
        &mut self,
        frame: &Frame,
        detector: &dyn Detector,
    ) -> ProducerResult<EmitResult> {
        self.evaluate_at(frame, detector, Utc::now()).await
    }

    /// Evaluate a frame as if it arrived at `now`
    pub async fn evaluate_at(
        &mut self,
        frame: &Frame,
        detector: &dyn Detector,
        now: DateTime<Utc>,
    ) -> ProducerResult<EmitResult> {
        let extension = self.frame_extension(frame)?;

        let accepted: Vec<Detection> = detector
            .detect(frame)?
            .into_iter()
            .filter(|d| d.confidence >= self.config.confidence_threshold)
            .collect();

        if accepted.is_empty() {
            return Ok(EmitResult::Suppressed {
                reason: SuppressReason::NoDetections,
            });
        }

        if let Some(last) = self.last_emission {
            // A clock that stepped backwards counts as no time elapsed
            let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
            if elapsed <= self.config.cooldown {
                debug!(
                    "Suppressed {} detections: {:?} since last alert",
                    accepted.len(),
                    elapsed
                );
                return Ok(EmitResult::Suppressed {
                    reason: SuppressReason::Cooldown,
                });
            }
        }

        let base_id = format!(
            "{}_{}",
            self.config.source_tag,
            now.format(ID_TIMESTAMP_FORMAT)
        );
        let triple = TripleSet::new(base_id, extension)
            .map_err(|e| ProducerError::InvalidFrame(e.to_string()))?;

        let display = detector.render(frame, &accepted)?;
        self.write_triple(&triple, frame, &display, &accepted).await?;

        self.last_emission = Some(now);
        self.emitted_count += 1;

        info!(
            alert_id = %triple.base_id(),
            detections = accepted.len(),
            "Alert emitted"
        );

        Ok(EmitResult::Emitted {
            base_id: triple.base_id().to_string(),
            detections: accepted,
        })
    }

    fn frame_extension(&self, frame: &Frame) -> ProducerResult<String> {
        let format = frame.format.trim();
        if format.is_empty() {
            return Ok(self.config.image_extension.clone());
        }
        let format = format.to_ascii_lowercase();
        if !is_image_extension(&format) {
            return Err(ProducerError::InvalidFrame(format!(
                "unsupported image format '{}'",
                frame.format
            )));
        }
        Ok(format)
    }

    async fn write_triple(
        &self,
        triple: &TripleSet,
        frame: &Frame,
        display: &[u8],
        detections: &[Detection],
    ) -> ProducerResult<()> {
        let clean_path = triple.clean_path(&self.alerts_dir);
        write_atomic(&clean_path, &frame.image)
            .await
            .map_err(|e| ProducerError::write(&clean_path, e))?;

        let annotation_path = triple.annotation_path(&self.alerts_dir);
        write_atomic(&annotation_path, format_annotation(detections).as_bytes())
            .await
            .map_err(|e| ProducerError::write(&annotation_path, e))?;

        let display_path = triple.display_path(&self.alerts_dir);
        write_atomic(&display_path, display)
            .await
            .map_err(|e| ProducerError::write(&display_path, e))?;

        Ok(())
    }
}
