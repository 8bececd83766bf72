//! Single-tier SORT tracker: one confidence gate, one association pass.

use crate::tracker::MultiObjectTracker;
use crate::tracker::cost::CostFunction;
use crate::tracker::matching::Detection;
use crate::tracker::track::TrackedObject;
use crate::tracker::track_pool::{Lifecycle, TrackPool};

/// Configuration for the [`SortTracker`].
#[derive(Debug, Clone)]
pub struct SortConfig {
    pub cost_function: CostFunction,
    pub max_age: u32,
    pub min_hits: u32,
    /// Minimum similarity for a track/detection pair to match.
    pub iou_threshold: f32,
    /// Detections below this confidence are discarded before association.
    pub conf_threshold: f32,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            cost_function: CostFunction::Iou,
            max_age: 1,
            min_hits: 3,
            iou_threshold: 0.3,
            conf_threshold: 0.25,
        }
    }
}

pub struct SortTracker<T: TrackedObject> {
    pool: TrackPool<T>,
    config: SortConfig,
}

impl<T: TrackedObject> SortTracker<T> {
    pub fn new(config: SortConfig) -> Self {
        Self::with_params(config, T::Params::default())
    }

    /// Like [`SortTracker::new`], handing `params` to every spawned object.
    pub fn with_params(config: SortConfig, params: T::Params) -> Self {
        let lifecycle = Lifecycle {
            max_age: config.max_age,
            min_hits: config.min_hits,
        };
        Self {
            pool: TrackPool::new(lifecycle, config.cost_function.resolve(), params),
            config,
        }
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }
}

impl<T: TrackedObject> MultiObjectTracker<T> for SortTracker<T> {
    fn update(&mut self, detections: &[Detection]) -> Vec<&mut T> {
        self.pool.begin_frame();

        // Low-confidence observations are never rescued by this strategy.
        let kept: Vec<usize> = detections
            .iter()
            .enumerate()
            .filter(|(_, d)| d.score >= self.config.conf_threshold)
            .map(|(i, _)| i)
            .collect();

        let all_tracks: Vec<usize> = (0..self.pool.tracks().len()).collect();
        let result = self
            .pool
            .associate(&all_tracks, detections, &kept, self.config.iou_threshold);

        self.pool.spawn(detections, &result.unmatched_detections);
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

    #[test]
    fn test_low_confidence_is_dropped() {
        let mut tracker: SortTracker<Track> = SortTracker::new(SortConfig {
            min_hits: 1,
            ..SortConfig::default()
        });
        let out = tracker.update(&[Detection::new(0.0, 0.0, 10.0, 10.0, 0.1)]);
        assert!(out.is_empty());
        assert!(tracker.tracks().is_empty());
    }
}
