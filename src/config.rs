//! Application and zone configuration.
//!
//! Both are plain JSON. Every key has a default so partial files work.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::evidence::DEFAULT_QUEUE_CAPACITY;
use crate::tracker::TrackerSettings;
use crate::violation::{
    DEFAULT_MIN_PLATE_LENGTH, DEFAULT_VOTE_THRESHOLD, LineCategory, LineSegment, Polygon,
    VehicleParams, segments_from_points,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViolationSettings {
    /// Frame rate of the source, used for the proof clip and frame window.
    pub fps: f32,
    /// Seconds of video kept for the proof clip.
    pub video_proof_duration: f32,
    /// Pixels added around the vehicle box in the proof crop.
    pub padding: u32,
    pub plate_vote_threshold: u32,
    /// Frames a pending vehicle outside the ROI waits for plate consensus.
    pub plate_wait_frames: u32,
    pub evidence_queue_capacity: usize,
    /// Recognizer reads this long or shorter are ignored.
    pub min_plate_length: usize,
}

impl Default for ViolationSettings {
    fn default() -> Self {
        Self {
            fps: 30.0,
            video_proof_duration: 3.0,
            padding: 30,
            plate_vote_threshold: DEFAULT_VOTE_THRESHOLD,
            plate_wait_frames: 15,
            evidence_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            min_plate_length: DEFAULT_MIN_PLATE_LENGTH,
        }
    }
}

impl ViolationSettings {
    pub fn vehicle_params(&self) -> VehicleParams {
        VehicleParams {
            vote_threshold: self.plate_vote_threshold,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(Error::InvalidConfig(format!("fps must be positive, got {}", self.fps)));
        }
        if !(self.video_proof_duration.is_finite() && self.video_proof_duration >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "video_proof_duration must not be negative, got {}",
                self.video_proof_duration
            )));
        }
        if self.plate_vote_threshold == 0 {
            return Err(Error::InvalidConfig("plate_vote_threshold must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tracking: TrackerSettings,
    pub violation: ViolationSettings,
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.violation.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::from_json(&fs::read_to_string(path)?)?;
        log::info!(
            "loaded {} with {} tracker",
            path.display(),
            config.tracking.strategy_name()
        );
        Ok(config)
    }
}

/// Line coordinates per category, as flat `[x, y]` lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinesConfig {
    pub violation_lines: Vec<[i32; 2]>,
    pub special_violation_lines: Vec<[i32; 2]>,
    pub left_exception_lines: Vec<[i32; 2]>,
    pub right_exception_lines: Vec<[i32; 2]>,
    pub other_exception_lines: Vec<[i32; 2]>,
}

impl LinesConfig {
    pub fn points(&self, category: LineCategory) -> &[[i32; 2]] {
        match category {
            LineCategory::Violation => &self.violation_lines,
            LineCategory::SpecialViolation => &self.special_violation_lines,
            LineCategory::LeftException => &self.left_exception_lines,
            LineCategory::RightException => &self.right_exception_lines,
            LineCategory::OtherException => &self.other_exception_lines,
        }
    }

    pub fn is_empty(&self) -> bool {
        LineCategory::ALL.iter().all(|&c| self.points(c).is_empty())
    }
}

/// ROI polygon and crossing lines drawn for one camera.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub polygon: Vec<[i32; 2]>,
    pub lines_config: LinesConfig,
    /// Older zone files store a single flat list of violation lines here.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<[i32; 2]>,
}

impl ZoneConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a zone file. A missing file is an empty zone.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!("zone file {} not found, using an empty zone", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// ROI for a frame of the given size, falling back to the centered
    /// quadrant when the stored polygon is unusable.
    pub fn roi(&self, frame_width: u32, frame_height: u32) -> Polygon {
        match Polygon::from_points(&self.polygon) {
            Ok(polygon) => polygon,
            Err(e) => {
                log::warn!("{e}; using the default ROI for {frame_width}x{frame_height}");
                Polygon::default_quadrant(frame_width, frame_height)
            }
        }
    }

    /// Raw points for a category, honoring the legacy `lines` key.
    pub fn points(&self, category: LineCategory) -> &[[i32; 2]] {
        if category == LineCategory::Violation
            && self.lines_config.is_empty()
            && !self.lines.is_empty()
        {
            return &self.lines;
        }
        self.lines_config.points(category)
    }

    /// Segments per category. Malformed categories are skipped.
    pub fn lines(&self) -> BTreeMap<LineCategory, Vec<LineSegment>> {
        let mut lines = BTreeMap::new();
        for category in LineCategory::ALL {
            match segments_from_points(self.points(category)) {
                Ok(segments) if segments.is_empty() => {}
                Ok(segments) => {
                    lines.insert(category, segments);
                }
                Err(e) => log::warn!("skipping {}: {e}", category.key()),
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.tracking.strategy_name(), "bytetrack");
        assert_eq!(config.violation, ViolationSettings::default());
    }

    #[test]
    fn test_app_config_partial() {
        let config = AppConfig::from_json(
            r#"{
                "tracking": {"strategy": "sort", "cost_function": "diou", "min_hits": 1},
                "violation": {"fps": 25, "padding": 10}
            }"#,
        )
        .unwrap();
        assert_eq!(config.tracking.strategy_name(), "sort");
        assert_eq!(config.violation.fps, 25.0);
        assert_eq!(config.violation.padding, 10);
        assert_eq!(config.violation.video_proof_duration, 3.0);
    }

    #[test]
    fn test_app_config_rejects_bad_values() {
        assert!(matches!(
            AppConfig::from_json(r#"{"violation": {"fps": 0}}"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            AppConfig::from_json(r#"{"tracking": {"strategy": "deepsort"}}"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_zone_categories() {
        let zone = ZoneConfig::from_json(
            r#"{
                "polygon": [[0,0],[10,0],[10,10],[0,10]],
                "lines_config": {
                    "violation_lines": [[0,5],[10,5]],
                    "left_exception_lines": [[0,2],[2,0],[5,5]]
                }
            }"#,
        )
        .unwrap();
        let lines = zone.lines();
        assert_eq!(lines[&LineCategory::Violation].len(), 1);
        // Odd-length category is dropped, the rest survive.
        assert!(!lines.contains_key(&LineCategory::LeftException));
        assert!(zone.roi(100, 100).contains((5.0, 5.0)));
    }

    #[test]
    fn test_legacy_lines_key() {
        let zone = ZoneConfig::from_json(r#"{"lines": [[0,5],[10,5],[0,7],[10,7]]}"#).unwrap();
        assert_eq!(zone.lines()[&LineCategory::Violation].len(), 2);
    }

    #[test]
    fn test_legacy_lines_ignored_when_categories_present() {
        let zone = ZoneConfig::from_json(
            r#"{
                "lines": [[0,5],[10,5]],
                "lines_config": {"other_exception_lines": [[0,1],[1,1]]}
            }"#,
        )
        .unwrap();
        assert!(!zone.lines().contains_key(&LineCategory::Violation));
    }

    #[test]
    fn test_short_polygon_falls_back_to_quadrant() {
        let zone = ZoneConfig::from_json(r#"{"polygon": [[0,0],[1,1]]}"#).unwrap();
        let roi = zone.roi(400, 200);
        assert_eq!(roi.vertices()[0], (100.0, 50.0));
        assert_eq!(roi.vertices()[2], (300.0, 150.0));
    }

    #[test]
    fn test_missing_zone_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let zone = ZoneConfig::load(dir.path().join("zones.json")).unwrap();
        assert_eq!(zone, ZoneConfig::default());
    }

    #[test]
    fn test_zone_file_round_trip_on_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"polygon": [[1,1],[9,1],[5,9]]}}"#).unwrap();
        let zone = ZoneConfig::load(file.path()).unwrap();
        assert_eq!(zone.polygon.len(), 3);

        let out = tempfile::tempdir().unwrap();
        let path = out.path().join("saved.json");
        zone.save(&path).unwrap();
        assert_eq!(ZoneConfig::load(&path).unwrap(), zone);
    }
}
