//! Integration tests for the detection producer
//!
//! Tests cover:
//! - Cooldown debounce with an explicit clock
//! - Confidence threshold filtering
//! - Triple-set contents and write order visibility
//! - Write failures leave the cooldown untouched

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;
use vigil_common::triple::parse_annotation;
use vigil_common::{BoundingBox, Detection, TripleSet};
use vigil_guard::{
    Detector, DetectionProducer, EmitResult, Frame, ProducerConfig, ProducerError,
    ProducerResult, ReportedDetections, SuppressReason,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn at(millis: i64) -> DateTime<Utc> {
    t0() + Duration::milliseconds(millis)
}

fn frame() -> Frame {
    Frame::new(b"raw-frame".to_vec(), "jpg")
}

fn detection(confidence: f32) -> Detection {
    Detection::new(0, confidence, BoundingBox::new(0.5, 0.5, 0.2, 0.3))
}

fn detector(confidences: &[f32]) -> ReportedDetections {
    let detections = confidences.iter().copied().map(detection).collect();
    ReportedDetections::new(detections, Some(b"annotated-frame".to_vec())).unwrap()
}

fn producer(temp: &TempDir) -> DetectionProducer {
    DetectionProducer::new(ProducerConfig::default(), temp.path())
}

fn file_names(temp: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

struct FailingDetector;

impl Detector for FailingDetector {
    fn detect(&self, _frame: &Frame) -> ProducerResult<Vec<Detection>> {
        Err(ProducerError::Detector("model not loaded".to_string()))
    }
}

#[tokio::test]
async fn test_cooldown_debounces_bursts() {
    let temp = TempDir::new().unwrap();
    let mut producer = producer(&temp);
    let hit = detector(&[0.9]);

    let mut emitted = Vec::new();
    for millis in [0, 300, 900, 1100] {
        let result = producer.evaluate_at(&frame(), &hit, at(millis)).await.unwrap();
        emitted.push(result.is_emitted());
    }

    assert_eq!(emitted, vec![true, false, false, true]);
    assert_eq!(producer.emitted_count(), 2);
    assert_eq!(producer.last_emission(), Some(at(1100)));
    assert_eq!(file_names(&temp).len(), 6);
}

#[tokio::test]
async fn test_cooldown_must_be_strictly_exceeded() {
    let temp = TempDir::new().unwrap();
    let mut producer = producer(&temp);
    let hit = detector(&[0.9]);

    assert!(producer.evaluate_at(&frame(), &hit, at(0)).await.unwrap().is_emitted());
    let result = producer.evaluate_at(&frame(), &hit, at(1000)).await.unwrap();
    assert_eq!(
        result,
        EmitResult::Suppressed {
            reason: SuppressReason::Cooldown
        }
    );
}

#[tokio::test]
async fn test_threshold_filters_detections() {
    let temp = TempDir::new().unwrap();
    let mut producer = producer(&temp);

    let result = producer
        .evaluate_at(&frame(), &detector(&[0.59, 0.60, 0.95]), at(0))
        .await
        .unwrap();

    let EmitResult::Emitted { base_id, detections } = result else {
        panic!("expected an emitted alert");
    };
    assert_eq!(detections.len(), 2);
    assert_eq!(base_id, "alert_20240601-120000-000");

    let labels = std::fs::read_to_string(temp.path().join(format!("{}.txt", base_id))).unwrap();
    assert_eq!(parse_annotation(&labels).unwrap().len(), 2);
    assert_eq!(
        labels,
        "0 0.500000 0.500000 0.200000 0.300000\n0 0.500000 0.500000 0.200000 0.300000"
    );
}

#[tokio::test]
async fn test_low_confidence_only_emits_nothing() {
    let temp = TempDir::new().unwrap();
    let mut producer = producer(&temp);

    for confidences in [&[][..], &[0.1, 0.59][..]] {
        let result = producer
            .evaluate_at(&frame(), &detector(confidences), at(0))
            .await
            .unwrap();
        assert_eq!(
            result,
            EmitResult::Suppressed {
                reason: SuppressReason::NoDetections
            }
        );
    }

    assert!(file_names(&temp).is_empty());
    assert_eq!(producer.last_emission(), None);
}

#[tokio::test]
async fn test_triple_set_contents() {
    let temp = TempDir::new().unwrap();
    let mut producer = producer(&temp);

    producer
        .evaluate_at(&frame(), &detector(&[0.8]), at(42))
        .await
        .unwrap();

    let id = "alert_20240601-120000-042";
    assert_eq!(
        file_names(&temp),
        vec![
            format!("{}.jpg", id),
            format!("{}.txt", id),
            format!("{}_display.jpg", id),
        ]
    );
    assert_eq!(std::fs::read(temp.path().join(format!("{}.jpg", id))).unwrap(), b"raw-frame");
    assert_eq!(
        std::fs::read(temp.path().join(format!("{}_display.jpg", id))).unwrap(),
        b"annotated-frame"
    );

    let triple = TripleSet::from_display_name(&format!("{}_display.jpg", id))
        .unwrap()
        .unwrap();
    assert_eq!(triple.base_id(), id);
}

#[tokio::test]
async fn test_display_defaults_to_raw_frame() {
    let temp = TempDir::new().unwrap();
    let mut producer = producer(&temp);
    let plain = ReportedDetections::new(vec![detection(0.9)], None).unwrap();

    let result = producer.evaluate_at(&frame(), &plain, at(0)).await.unwrap();
    let EmitResult::Emitted { base_id, .. } = result else {
        panic!("expected an emitted alert");
    };
    assert_eq!(
        std::fs::read(temp.path().join(format!("{}_display.jpg", base_id))).unwrap(),
        b"raw-frame"
    );
}

#[tokio::test]
async fn test_frame_format_sets_extension() {
    let temp = TempDir::new().unwrap();
    let mut producer = producer(&temp);
    let png = Frame::new(b"png-bytes".to_vec(), "PNG");

    producer.evaluate_at(&png, &detector(&[0.9]), at(0)).await.unwrap();
    assert!(temp.path().join("alert_20240601-120000-000_display.png").exists());

    let bogus = Frame::new(b"x".to_vec(), "exe");
    assert!(matches!(
        producer.evaluate_at(&bogus, &detector(&[0.9]), at(5000)).await,
        Err(ProducerError::InvalidFrame(_))
    ));
}

#[tokio::test]
async fn test_failed_write_keeps_cooldown_open() {
    let temp = TempDir::new().unwrap();
    let alerts = temp.path().join("alerts");
    let mut producer = DetectionProducer::new(ProducerConfig::default(), &alerts);
    let hit = detector(&[0.9]);

    assert!(matches!(
        producer.evaluate_at(&frame(), &hit, at(0)).await,
        Err(ProducerError::Write { .. })
    ));
    assert_eq!(producer.last_emission(), None);
    assert_eq!(producer.emitted_count(), 0);

    std::fs::create_dir(&alerts).unwrap();
    assert!(producer.evaluate_at(&frame(), &hit, at(100)).await.unwrap().is_emitted());
}

#[tokio::test]
async fn test_detector_failure_propagates() {
    let temp = TempDir::new().unwrap();
    let mut producer = producer(&temp);

    assert!(matches!(
        producer.evaluate_at(&frame(), &FailingDetector, at(0)).await,
        Err(ProducerError::Detector(_))
    ));
    assert!(file_names(&temp).is_empty());
}

#[tokio::test]
async fn test_zero_cooldown_still_needs_time_to_pass() {
    let temp = TempDir::new().unwrap();
    let config = ProducerConfig {
        cooldown: std::time::Duration::ZERO,
        ..ProducerConfig::default()
    };
    let mut producer = DetectionProducer::new(config, temp.path());
    let hit = detector(&[0.9]);

    assert!(producer.evaluate_at(&frame(), &hit, at(0)).await.unwrap().is_emitted());
    assert!(!producer.evaluate_at(&frame(), &hit, at(0)).await.unwrap().is_emitted());
    assert!(producer.evaluate_at(&frame(), &hit, at(1)).await.unwrap().is_emitted());
}
