//! Triple-set protocol
//!
//! One candidate alert is stored as three sibling files sharing a base id `B`:
//!
//! | Artifact   | File name          | Lifetime                                   |
//! |------------|--------------------|--------------------------------------------|
//! | display    | `B_display.<ext>`  | permanent (never touched by curation)      |
//! | clean      | `B.<ext>`          | present while the alert is pending         |
//! | annotation | `B.txt`            | present while the alert is pending         |
//!
//! The annotation file holds one line per detected object:
//! `<class_index> <cx> <cy> <w> <h>`, geometry normalized to [0,1] with six decimals.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix appended to the base id for the human-facing artifact
pub const DISPLAY_SUFFIX: &str = "_display";

/// Extension of the annotation artifact
pub const ANNOTATION_EXTENSION: &str = "txt";

/// Image extensions recognised for display and clean artifacts
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];

/// Review status of an alert
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Clean artifact still in the alert directory, awaiting review
    Pending,
    /// Reviewer marked it a true positive during this process lifetime
    Confirmed,
    /// Reviewer marked it a false positive during this process lifetime
    Dismissed,
    /// Decided at some point, but the decision is no longer known
    Archived,
}

impl AlertStatus {
    /// Terminal statuses accept no further reviewer action
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AlertStatus::Pending)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertStatus::Pending => write!(f, "pending"),
            AlertStatus::Confirmed => write!(f, "confirmed"),
            AlertStatus::Dismissed => write!(f, "dismissed"),
            AlertStatus::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(AlertStatus::Pending),
            "confirmed" => Ok(AlertStatus::Confirmed),
            "dismissed" => Ok(AlertStatus::Dismissed),
            "archived" => Ok(AlertStatus::Archived),
            other => Err(format!("unknown alert status: {}", other)),
        }
    }
}

/// Box geometry normalized to image dimensions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    /// Center x in [0,1]
    pub cx: f32,
    /// Center y in [0,1]
    pub cy: f32,
    /// Width in [0,1]
    pub w: f32,
    /// Height in [0,1]
    pub h: f32,
}

impl BoundingBox {
    pub fn new(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self { cx, cy, w, h }
    }

    /// All four values lie in [0,1]
    pub fn is_normalized(&self) -> bool {
        [self.cx, self.cy, self.w, self.h]
            .iter()
            .all(|v| v.is_finite() && (0.0..=1.0).contains(v))
    }
}

/// One object reported by the detector
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub class_index: u32,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_index: u32, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_index,
            confidence,
            bbox,
        }
    }
}

/// One parsed line of an annotation artifact (confidence is not persisted)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LabelLine {
    pub class_index: u32,
    pub bbox: BoundingBox,
}

/// Naming errors for alert artifacts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TripleError {
    /// Display-suffixed file whose base id is unusable
    #[error("Malformed artifact name '{name}': {reason}")]
    MalformedName { name: String, reason: String },

    /// Annotation line that does not follow `<class> <cx> <cy> <w> <h>`
    #[error("Malformed annotation line {line}: {reason}")]
    MalformedAnnotation { line: usize, reason: String },
}

/// The three artifact names of one alert
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TripleSet {
    base_id: String,
    extension: String,
}

impl TripleSet {
    /// Build a triple-set from a base id and image extension
    pub fn new(base_id: impl Into<String>, extension: impl Into<String>) -> Result<Self, TripleError> {
        let base_id = base_id.into();
        let extension = extension.into();
        validate_base_id(&base_id).map_err(|reason| TripleError::MalformedName {
            name: base_id.clone(),
            reason,
        })?;
        if !is_image_extension(&extension) {
            return Err(TripleError::MalformedName {
                name: base_id,
                reason: format!("unsupported image extension '{}'", extension),
            });
        }
        Ok(Self { base_id, extension })
    }

    /// Parse a display artifact path.
    ///
    /// Returns `Ok(None)` for files that are not display artifacts at all,
    /// and `Err` for display-suffixed files whose base id is invalid.
    pub fn from_display_path(path: &Path) -> Result<Option<Self>, TripleError> {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };
        Self::from_display_name(file_name)
    }

    /// Parse a display artifact file name, see [`TripleSet::from_display_path`]
    pub fn from_display_name(file_name: &str) -> Result<Option<Self>, TripleError> {
        let Some((stem, extension)) = file_name.rsplit_once('.') else {
            return Ok(None);
        };
        if !is_image_extension(extension) {
            return Ok(None);
        }
        let Some(base_id) = stem.strip_suffix(DISPLAY_SUFFIX) else {
            return Ok(None);
        };

        validate_base_id(base_id).map_err(|reason| TripleError::MalformedName {
            name: file_name.to_string(),
            reason,
        })?;

        Ok(Some(Self {
            base_id: base_id.to_string(),
            extension: extension.to_string(),
        }))
    }

    /// Shared base identifier, also the alert id
    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    /// Image extension shared by the display and clean artifacts
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn display_name(&self) -> String {
        format!("{}{}.{}", self.base_id, DISPLAY_SUFFIX, self.extension)
    }

    pub fn clean_name(&self) -> String {
        format!("{}.{}", self.base_id, self.extension)
    }

    pub fn annotation_name(&self) -> String {
        format!("{}.{}", self.base_id, ANNOTATION_EXTENSION)
    }

    pub fn display_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.display_name())
    }

    pub fn clean_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.clean_name())
    }

    pub fn annotation_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.annotation_name())
    }

    /// Provenance label: the id up to its first underscore
    pub fn source_tag(&self) -> &str {
        source_tag(&self.base_id)
    }
}

/// Provenance label of an alert id (`alert_20250101-...` -> `alert`)
pub fn source_tag(base_id: &str) -> &str {
    base_id.split('_').next().unwrap_or(base_id)
}

/// Check extension against [`IMAGE_EXTENSIONS`], case-insensitive
pub fn is_image_extension(extension: &str) -> bool {
    let lower = extension.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&lower.as_str())
}

fn validate_base_id(base_id: &str) -> Result<(), String> {
    if base_id.is_empty() {
        return Err("empty base id".to_string());
    }
    if base_id.starts_with('.') {
        return Err("hidden base id".to_string());
    }
    if base_id.contains(|c| c == '/' || c == '\\') || base_id.contains("..") {
        return Err("base id contains a path separator".to_string());
    }
    if base_id.ends_with(DISPLAY_SUFFIX) {
        return Err("base id carries a second display suffix".to_string());
    }
    if base_id.chars().any(char::is_control) {
        return Err("base id contains control characters".to_string());
    }
    Ok(())
}

/// Render detections in the annotation format, one object per line.
///
/// Geometry is written with fixed six-decimal precision.
pub fn format_annotation(detections: &[Detection]) -> String {
    detections
        .iter()
        .map(|d| {
            format!(
                "{} {:.6} {:.6} {:.6} {:.6}",
                d.class_index, d.bbox.cx, d.bbox.cy, d.bbox.w, d.bbox.h
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse the contents of an annotation artifact. Blank lines are ignored.
pub fn parse_annotation(content: &str) -> Result<Vec<LabelLine>, TripleError> {
    let mut lines = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(TripleError::MalformedAnnotation {
                line: line_no,
                reason: format!("expected 5 fields, found {}", fields.len()),
            });
        }

        let class_index = fields[0]
            .parse::<u32>()
            .map_err(|e| TripleError::MalformedAnnotation {
                line: line_no,
                reason: format!("class index: {}", e),
            })?;

        let mut geometry = [0f32; 4];
        for (slot, field) in geometry.iter_mut().zip(&fields[1..]) {
            *slot = field
                .parse::<f32>()
                .map_err(|e| TripleError::MalformedAnnotation {
                    line: line_no,
                    reason: format!("geometry '{}': {}", field, e),
                })?;
        }

        let bbox = BoundingBox::new(geometry[0], geometry[1], geometry[2], geometry[3]);
        if !bbox.is_normalized() {
            return Err(TripleError::MalformedAnnotation {
                line: line_no,
                reason: "geometry outside [0,1]".to_string(),
            });
        }

        lines.push(LabelLine { class_index, bbox });
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_share_base_id() {
        let triple = TripleSet::new("alert_20250101-120000-000", "jpg").unwrap();
        assert_eq!(triple.display_name(), "alert_20250101-120000-000_display.jpg");
        assert_eq!(triple.clean_name(), "alert_20250101-120000-000.jpg");
        assert_eq!(triple.annotation_name(), "alert_20250101-120000-000.txt");
    }

    #[test]
    fn test_display_name_round_trips_to_base_id() {
        let parsed = TripleSet::from_display_name("alert_20250101-120000-000_display.jpg")
            .unwrap()
            .unwrap();
        assert_eq!(parsed.base_id(), "alert_20250101-120000-000");
        assert_eq!(parsed.extension(), "jpg");
        assert_eq!(parsed.source_tag(), "alert");
    }

    #[test]
    fn test_non_display_files_are_ignored() {
        assert_eq!(TripleSet::from_display_name("alert_1.jpg").unwrap(), None);
        assert_eq!(TripleSet::from_display_name("alert_1.txt").unwrap(), None);
        assert_eq!(TripleSet::from_display_name("alert_1_display.txt").unwrap(), None);
        assert_eq!(TripleSet::from_display_name("README").unwrap(), None);
        assert_eq!(
            TripleSet::from_display_name(".alert_1_display.jpg.partial").unwrap(),
            None
        );
    }

    #[test]
    fn test_uppercase_extension_accepted() {
        let parsed = TripleSet::from_display_name("cam2_x_display.PNG").unwrap().unwrap();
        assert_eq!(parsed.clean_name(), "cam2_x.PNG");
        assert_eq!(parsed.source_tag(), "cam2");
    }

    #[test]
    fn test_malformed_display_names() {
        for name in ["_display.jpg", "._display.jpg", ".hidden_display.jpg", "a_display_display.jpg"] {
            let result = TripleSet::from_display_name(name);
            assert!(
                matches!(result, Err(TripleError::MalformedName { .. })),
                "{} should be malformed, got {:?}",
                name,
                result
            );
        }
    }

    #[test]
    fn test_new_rejects_unknown_extension() {
        assert!(TripleSet::new("alert_1", "gif").is_err());
        assert!(TripleSet::new("", "jpg").is_err());
    }

    #[test]
    fn test_source_tag_without_underscore() {
        assert_eq!(source_tag("frame42"), "frame42");
    }

    #[test]
    fn test_format_annotation_six_decimals() {
        let detections = vec![
            Detection::new(0, 0.91, BoundingBox::new(0.5, 0.25, 0.1, 0.2)),
            Detection::new(3, 0.75, BoundingBox::new(1.0, 0.0, 0.333333, 0.05)),
        ];
        assert_eq!(
            format_annotation(&detections),
            "0 0.500000 0.250000 0.100000 0.200000\n3 1.000000 0.000000 0.333333 0.050000"
        );
    }

    #[test]
    fn test_parse_annotation() {
        let lines = parse_annotation("0 0.500000 0.250000 0.100000 0.200000\n\n2 0.1 0.2 0.3 0.4\n").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].class_index, 0);
        assert_eq!(lines[1].class_index, 2);
        assert!((lines[1].bbox.h - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_parse_annotation_rejects_bad_lines() {
        assert!(matches!(
            parse_annotation("0 0.5 0.5 0.1"),
            Err(TripleError::MalformedAnnotation { line: 1, .. })
        ));
        assert!(matches!(
            parse_annotation("0 0.5 0.5 0.1 0.1\nx 0.5 0.5 0.1 0.1"),
            Err(TripleError::MalformedAnnotation { line: 2, .. })
        ));
        assert!(parse_annotation("0 1.5 0.5 0.1 0.1").is_err());
    }

    #[test]
    fn test_status_terminality() {
        assert!(!AlertStatus::Pending.is_terminal());
        assert!(AlertStatus::Confirmed.is_terminal());
        assert!(AlertStatus::Dismissed.is_terminal());
        assert!(AlertStatus::Archived.is_terminal());
        assert_eq!("ARCHIVED".parse::<AlertStatus>().unwrap(), AlertStatus::Archived);
    }
}
