//! Detector capability consumed by the producer
//!
//! Inference runs outside this process. A [`Detector`] turns one frame into
//! normalized detections and, optionally, an annotated rendering of it.

use vigil_common::Detection;

use crate::error::{ProducerError, ProducerResult};

/// One encoded camera frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Encoded image bytes, written unmodified as the clean artifact
    pub image: Vec<u8>,
    /// Image extension matching the encoding (`jpg`, `png`, ...)
    pub format: String,
}

impl Frame {
    pub fn new(image: Vec<u8>, format: impl Into<String>) -> Self {
        Self {
            image,
            format: format.into(),
        }
    }
}

pub trait Detector: Send + Sync {
    /// All detections in the frame, before any confidence filtering
    fn detect(&self, frame: &Frame) -> ProducerResult<Vec<Detection>>;

    /// Annotated image for the display artifact.
    ///
    /// Detectors that cannot draw return the raw frame.
    fn render(&self, frame: &Frame, _detections: &[Detection]) -> ProducerResult<Vec<u8>> {
        Ok(frame.image.clone())
    }
}

/// Detections (and optional rendering) already computed by the inference process
#[derive(Debug, Clone, Default)]
pub struct ReportedDetections {
    detections: Vec<Detection>,
    annotated: Option<Vec<u8>>,
}

impl ReportedDetections {
    /// Reject confidences or geometry outside [0, 1]
    pub fn new(detections: Vec<Detection>, annotated: Option<Vec<u8>>) -> ProducerResult<Self> {
        for (idx, detection) in detections.iter().enumerate() {
            if !(0.0..=1.0).contains(&detection.confidence) {
                return Err(ProducerError::InvalidFrame(format!(
                    "detection {}: confidence {} outside [0, 1]",
                    idx, detection.confidence
                )));
            }
            if !detection.bbox.is_normalized() {
                return Err(ProducerError::InvalidFrame(format!(
                    "detection {}: box geometry outside [0, 1]",
                    idx
                )));
            }
        }
        Ok(Self {
            detections,
            annotated,
        })
    }
}

impl Detector for ReportedDetections {
    fn detect(&self, _frame: &Frame) -> ProducerResult<Vec<Detection>> {
        Ok(self.detections.clone())
    }

    fn render(&self, frame: &Frame, _detections: &[Detection]) -> ProducerResult<Vec<u8>> {
        Ok(self
            .annotated
            .clone()
            .unwrap_or_else(|| frame.image.clone()))
    }
}
