//! Vehicle tracking and red-light violation detection.
//!
//! Detections flow through a [`MultiObjectTracker`] into [`Vehicle`] tracks,
//! the [`ViolationManager`] evaluates zone and light rules on them, and
//! confirmed violations leave the frame loop as [`EvidenceJob`]s through a
//! bounded hand-off queue drained by a background persistence worker.

pub mod config;
pub mod error;
pub mod evidence;
pub mod integration;
pub mod tracker;
pub mod violation;

pub use config::{AppConfig, ViolationSettings, ZoneConfig};
pub use error::{Error, Result};
pub use evidence::{EvidenceJob, EvidenceQueue, EvidenceStore, FileEvidenceStore, Frame, FrameRing};
pub use integration::{DetectionBuilder, DetectionSource, PlateRecognizer, TrafficPipeline};
pub use tracker::{
    ByteTracker, CostFunction, Detection, MultiObjectTracker, Rect, SortTracker, Track,
    TrackedObject, TrackerSettings,
};
pub use violation::{
    LightColor, LightState, RedLightRule, Vehicle, ViolationManager, ViolationRule,
    ViolationStatus,
};
