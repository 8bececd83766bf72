//! Single object track for multi-object tracking.

use ndarray::{Array1, Array2};

use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;

/// Anything a tracker can store: a bare [`Track`] or a richer entity that
/// wraps one.
///
/// Trackers allocate ids and drive the motion model through
/// [`TrackedObject::track_mut`]; everything else on the entity is left alone.
pub trait TrackedObject {
    /// Per-tracker settings handed to every spawned object.
    type Params: Clone + Default;

    /// Start a new object from an unmatched detection.
    fn spawn(
        track_id: u64,
        detection: &Detection,
        kalman_filter: &KalmanFilter,
        params: &Self::Params,
    ) -> Self;

    fn track(&self) -> &Track;

    fn track_mut(&mut self) -> &mut Track;
}

/// Single object track.
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique track identifier
    pub track_id: u64,
    /// Detector class label
    pub class_id: u32,
    /// Detection confidence of the last correcting measurement
    pub score: f32,
    /// Number of predict steps since birth
    pub age: u32,
    /// Total number of corrections
    pub hits: u32,
    /// Consecutive frames with a correction
    pub hit_streak: u32,
    /// Frames since the last correction
    pub time_since_update: u32,
    /// Kalman filter state mean (7-dim)
    mean: Array1<f64>,
    /// Kalman filter state covariance (7x7)
    covariance: Array2<f64>,
}

impl Track {
    /// Create a new Track from a detection.
    pub fn new(track_id: u64, detection: &Detection, kalman_filter: &KalmanFilter) -> Self {
        let (mean, covariance) = kalman_filter.initiate(detection.bbox.to_xysr());
        Self {
            track_id,
            class_id: detection.class_id,
            score: detection.score,
            age: 0,
            hits: 0,
            hit_streak: 0,
            time_since_update: 0,
            mean,
            covariance,
        }
    }

    /// Get the current bounding box estimate.
    pub fn rect(&self) -> Rect {
        Rect::from_xysr(self.mean[0], self.mean[1], self.mean[2], self.mean[3])
    }

    /// A track whose state went non-finite cannot be associated.
    pub fn is_valid(&self) -> bool {
        self.mean.iter().all(|v| v.is_finite()) && self.rect().is_finite()
    }

    /// Advance the state one frame and return the predicted box.
    pub fn predict(&mut self, kalman_filter: &KalmanFilter) -> Rect {
        let (mean, covariance) = kalman_filter.predict(&self.mean, &self.covariance);
        self.mean = mean;
        self.covariance = covariance;

        self.age += 1;
        if self.time_since_update > 0 {
            self.hit_streak = 0;
        }
        self.time_since_update += 1;

        self.rect()
    }

    /// Correct the state with a matched detection.
    pub fn correct(&mut self, detection: &Detection, kalman_filter: &KalmanFilter) {
        self.time_since_update = 0;
        self.hits += 1;
        self.hit_streak += 1;
        self.score = detection.score;

        match kalman_filter.update(&self.mean, &self.covariance, detection.bbox.to_xysr()) {
            Some((mean, covariance)) => {
                self.mean = mean;
                self.covariance = covariance;
            }
            None => {
                // Poison the state so the next cycle excises the track.
                self.mean.fill(f64::NAN);
            }
        }
    }
}

impl TrackedObject for Track {
    type Params = ();

    fn spawn(track_id: u64, detection: &Detection, kalman_filter: &KalmanFilter, _: &()) -> Self {
        Track::new(track_id, detection, kalman_filter)
    }

    fn track(&self) -> &Track {
        self
    }

    fn track_mut(&mut self) -> &mut Track {
        self
    }
}
