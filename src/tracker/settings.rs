//! Serde-facing tracker selection.

use serde::{Deserialize, Serialize};

use crate::tracker::MultiObjectTracker;
use crate::tracker::byte_tracker::{ByteTrackConfig, ByteTracker};
use crate::tracker::cost::CostFunction;
use crate::tracker::sort_tracker::{SortConfig, SortTracker};
use crate::tracker::track::TrackedObject;

/// Tracker strategy as written in configuration files.
///
/// Tagged by `"strategy"`; an unknown strategy fails deserialization so a bad
/// configuration is rejected before the frame loop starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum TrackerSettings {
    Sort {
        #[serde(default)]
        cost_function: CostFunction,
        #[serde(default = "default_max_age")]
        max_age: u32,
        #[serde(default = "default_min_hits")]
        min_hits: u32,
        #[serde(default = "default_iou_threshold")]
        iou_threshold: f32,
        #[serde(default = "default_sort_conf_threshold")]
        conf_threshold: f32,
    },
    ByteTrack {
        #[serde(default)]
        cost_function: CostFunction,
        #[serde(default = "default_max_age")]
        max_age: u32,
        #[serde(default = "default_min_hits")]
        min_hits: u32,
        #[serde(default = "default_high_conf_threshold")]
        high_conf_threshold: f32,
        #[serde(default = "default_low_conf_threshold")]
        low_conf_threshold: f32,
        #[serde(default = "default_high_conf_iou_threshold")]
        high_conf_iou_threshold: f32,
        #[serde(default = "default_low_conf_iou_threshold")]
        low_conf_iou_threshold: f32,
    },
}

fn default_max_age() -> u32 {
    1
}

fn default_min_hits() -> u32 {
    3
}

fn default_iou_threshold() -> f32 {
    0.3
}

fn default_sort_conf_threshold() -> f32 {
    0.25
}

fn default_high_conf_threshold() -> f32 {
    0.5
}

fn default_low_conf_threshold() -> f32 {
    0.1
}

fn default_high_conf_iou_threshold() -> f32 {
    0.5
}

fn default_low_conf_iou_threshold() -> f32 {
    0.3
}

impl Default for TrackerSettings {
    fn default() -> Self {
        TrackerSettings::ByteTrack {
            cost_function: CostFunction::Iou,
            max_age: default_max_age(),
            min_hits: default_min_hits(),
            high_conf_threshold: default_high_conf_threshold(),
            low_conf_threshold: default_low_conf_threshold(),
            high_conf_iou_threshold: default_high_conf_iou_threshold(),
            low_conf_iou_threshold: default_low_conf_iou_threshold(),
        }
    }
}

impl TrackerSettings {
    pub fn strategy_name(&self) -> &'static str {
        match self {
            TrackerSettings::Sort { .. } => "sort",
            TrackerSettings::ByteTrack { .. } => "bytetrack",
        }
    }

    /// Build the configured tracker for any tracked entity type.
    pub fn build<T: TrackedObject + 'static>(
        &self,
        params: T::Params,
    ) -> Box<dyn MultiObjectTracker<T>> {
        match *self {
            TrackerSettings::Sort {
                cost_function,
                max_age,
                min_hits,
                iou_threshold,
                conf_threshold,
            } => Box::new(SortTracker::with_params(
                SortConfig {
                    cost_function,
                    max_age,
                    min_hits,
                    iou_threshold,
                    conf_threshold,
                },
                params,
            )),
            TrackerSettings::ByteTrack {
                cost_function,
                max_age,
                min_hits,
                high_conf_threshold,
                low_conf_threshold,
                high_conf_iou_threshold,
                low_conf_iou_threshold,
            } => Box::new(ByteTracker::with_params(
                ByteTrackConfig {
                    cost_function,
                    max_age,
                    min_hits,
                    high_conf_threshold,
                    low_conf_threshold,
                    high_conf_iou_threshold,
                    low_conf_iou_threshold,
                },
                params,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Track;

    #[test]
    fn test_parse_sort_with_defaults() {
        let settings: TrackerSettings =
            serde_json::from_str(r#"{"strategy": "sort", "min_hits": 5, "cost_function": "diou"}"#)
                .unwrap();
        assert_eq!(
            settings,
            TrackerSettings::Sort {
                cost_function: CostFunction::Diou,
                max_age: 1,
                min_hits: 5,
                iou_threshold: 0.3,
                conf_threshold: 0.25,
            }
        );
    }

    #[test]
    fn test_parse_bytetrack() {
        let settings: TrackerSettings =
            serde_json::from_str(r#"{"strategy": "bytetrack", "max_age": 60}"#).unwrap();
        assert_eq!(settings.strategy_name(), "bytetrack");
        let tracker = settings.build::<Track>(());
        assert_eq!(tracker.frame_count(), 0);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let parsed = serde_json::from_str::<TrackerSettings>(r#"{"strategy": "deepsort"}"#);
        assert!(parsed.is_err());
    }
}
