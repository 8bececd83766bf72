//! Two-tier cascaded (ByteTrack-style) tracker.
//!
//! High-confidence detections are matched first against every track. The
//! low-confidence leftovers then get a second, looser pass restricted to the
//! tracks still unmatched. Only high-confidence detections may start tracks,
//! so a faint detection can keep a known object alive but never invent one.

use crate::tracker::MultiObjectTracker;
use crate::tracker::cost::CostFunction;
use crate::tracker::matching::{AssignmentResult, Detection};
use crate::tracker::track::TrackedObject;
use crate::tracker::track_pool::{Lifecycle, TrackPool};

/// Configuration for the [`ByteTracker`].
#[derive(Debug, Clone)]
pub struct ByteTrackConfig {
    pub cost_function: CostFunction,
    pub max_age: u32,
    pub min_hits: u32,
    /// Detections at or above this score enter the first pass.
    pub high_conf_threshold: f32,
    /// Detections between this and `high_conf_threshold` enter the rescue pass.
    pub low_conf_threshold: f32,
    /// Minimum similarity in the first pass.
    pub high_conf_iou_threshold: f32,
    /// Minimum similarity in the rescue pass.
    pub low_conf_iou_threshold: f32,
}

impl Default for ByteTrackConfig {
    fn default() -> Self {
        Self {
            cost_function: CostFunction::Iou,
            max_age: 1,
            min_hits: 3,
            high_conf_threshold: 0.5,
            low_conf_threshold: 0.1,
            high_conf_iou_threshold: 0.5,
            low_conf_iou_threshold: 0.3,
        }
    }
}

pub struct ByteTracker<T: TrackedObject> {
    pool: TrackPool<T>,
    config: ByteTrackConfig,
}

impl<T: TrackedObject> ByteTracker<T> {
    pub fn new(config: ByteTrackConfig) -> Self {
        Self::with_params(config, T::Params::default())
    }

    /// Like [`ByteTracker::new`], handing `params` to every spawned object.
    pub fn with_params(config: ByteTrackConfig, params: T::Params) -> Self {
        let lifecycle = Lifecycle {
            max_age: config.max_age,
            min_hits: config.min_hits,
        };
        Self {
            pool: TrackPool::new(lifecycle, config.cost_function.resolve(), params),
            config,
        }
    }

    pub fn config(&self) -> &ByteTrackConfig {
        &self.config
    }
}

impl<T: TrackedObject> MultiObjectTracker<T> for ByteTracker<T> {
    fn update(&mut self, detections: &[Detection]) -> Vec<&mut T> {
        self.pool.begin_frame();

        // Step 1: Split detections into high-score and low-score
        let mut detections_high = Vec::new();
        let mut detections_low = Vec::new();
        for (i, det) in detections.iter().enumerate() {
            if det.score >= self.config.high_conf_threshold {
                detections_high.push(i);
            } else if det.score >= self.config.low_conf_threshold {
                detections_low.push(i);
            }
        }

        // Step 2: First association, with high score detections
        let all_tracks: Vec<usize> = (0..self.pool.tracks().len()).collect();
        let AssignmentResult {
            unmatched_tracks,
            unmatched_detections: unmatched_high,
            ..
        } = self.pool.associate(
            &all_tracks,
            detections,
            &detections_high,
            self.config.high_conf_iou_threshold,
        );

        // Step 3: Second association, low score detections against leftovers
        let rescued = self.pool.associate(
            &unmatched_tracks,
            detections,
            &detections_low,
            self.config.low_conf_iou_threshold,
        );
        if !rescued.matches.is_empty() {
            log::debug!(
                "frame {}: rescued {} tracks with low-confidence detections",
                self.pool.frame_count(),
                rescued.matches.len()
            );
        }

        // Step 4: Init new tracks from high score leftovers only
        self.pool.spawn(detections, &unmatched_high);

        self.pool.finish_frame()
    }

    fn tracks(&self) -> &[T] {
        self.pool.tracks()
    }

    fn expired(&mut self) -> &mut [T] {
        self.pool.expired()
    }

    fn frame_count(&self) -> u32 {
        self.pool.frame_count()
    }

    fn reset(&mut self) {
        self.pool.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Track;

    fn tracker() -> ByteTracker<Track> {
        ByteTracker::new(ByteTrackConfig {
            min_hits: 1,
            ..ByteTrackConfig::default()
        })
    }

    #[test]
    fn test_low_confidence_noise_spawns_nothing() {
        let mut tracker = tracker();
        tracker.update(&[Detection::new(10.0, 10.0, 50.0, 50.0, 0.9)]);
        assert_eq!(tracker.tracks().len(), 1);

        tracker.update(&[Detection::new(200.0, 200.0, 250.0, 250.0, 0.4)]);
        assert_eq!(tracker.tracks().len(), 1);
    }

    #[test]
    fn test_below_low_threshold_is_ignored() {
        let mut tracker = tracker();
        tracker.update(&[Detection::new(10.0, 10.0, 50.0, 50.0, 0.9)]);
        let out = tracker.update(&[Detection::new(10.0, 10.0, 50.0, 50.0, 0.05)]);
        assert!(out.is_empty());
        assert_eq!(tracker.tracks()[0].time_since_update, 1);
    }
}
