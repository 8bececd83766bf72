mod byte_tracker;
mod cost;
mod kalman_filter;
mod matching;
mod rect;
mod settings;
mod sort_tracker;
mod track;
mod track_pool;

pub use byte_tracker::{ByteTrackConfig, ByteTracker};
pub use cost::{CostFn, CostFunction, similarity_matrix};
pub use kalman_filter::KalmanFilter;
pub use matching::{AssignmentResult, Detection, linear_assignment};
pub use rect::Rect;
pub use settings::TrackerSettings;
pub use sort_tracker::{SortConfig, SortTracker};
pub use track::{Track, TrackedObject};
pub use track_pool::{Lifecycle, TrackPool};

/// A frame-by-frame multi-object tracker.
///
/// `update` must be called exactly once per processed frame, with an empty
/// slice when the detector found nothing, so age counters stay correct.
pub trait MultiObjectTracker<T> {
    /// Run one predict/associate/correct cycle and return the tracks that
    /// are reportable this frame.
    fn update(&mut self, detections: &[Detection]) -> Vec<&mut T>;

    /// Every live track, reported or not.
    fn tracks(&self) -> &[T];

    /// Tracks deleted by the last `update`, still in their final state.
    fn expired(&mut self) -> &mut [T];

    /// Frames processed since construction or the last reset.
    fn frame_count(&self) -> u32;

    /// Drop all tracks and restart id allocation.
    fn reset(&mut self);
}
