//! Connecting detection and recognition backends to the tracker and the
//! violation rules.

mod builder;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detector::{DetectionSource, IntoDetections, PlateRecognizer};
pub use pipeline::{FrameReport, TrafficPipeline, VehicleReport, ViolationNotice};
