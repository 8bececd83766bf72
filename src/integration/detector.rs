//! Contracts for the models feeding the frame loop.

use crate::evidence::Frame;
use crate::tracker::{Detection, Rect};

/// Trait for vehicle detection backends.
///
/// Called exactly once per processed frame, including frames with nothing in
/// them, so the tracker's age counters stay correct.
///
/// # Example
///
/// ```ignore
/// use redlight_track::{Detection, DetectionSource, Frame};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures.
    type Error: std::fmt::Display;

    /// Run inference on a frame.
    ///
    /// A failure is logged by the pipeline and the frame is tracked with no
    /// detections.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error>;
}

/// Reads a licence-plate candidate from a vehicle.
///
/// Runs inline in the frame loop at most once per vehicle per frame, so
/// implementations must return promptly. A miss or an internal failure is
/// `None`.
pub trait PlateRecognizer {
    fn recognize(&mut self, vehicle_box: &Rect, frame: &Frame) -> Option<String>;
}

impl<F> PlateRecognizer for F
where
    F: FnMut(&Rect, &Frame) -> Option<String>,
{
    fn recognize(&mut self, vehicle_box: &Rect, frame: &Frame) -> Option<String> {
        self(vehicle_box, frame)
    }
}

/// Helper trait for converting model-specific outputs to `Detection`.
pub trait IntoDetections {
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}

/// Rows of `[x1, y1, x2, y2, confidence, class_id]`.
impl IntoDetections for Vec<[f32; 6]> {
    fn into_detections(self) -> Vec<Detection> {
        self.into_iter().map(Detection::from).collect()
    }
}
