//! Association engine shared by the single-tier and cascaded trackers.
//!
//! One frame is a fixed sequence: [`TrackPool::begin_frame`] predicts every
//! track and excises invalid ones, the strategy calls
//! [`TrackPool::associate`] one or more times, then [`TrackPool::spawn`] for
//! the detections it wants born, and [`TrackPool::finish_frame`] expires
//! stale tracks and returns the reportable ones. Tracks removed during a
//! frame stay readable through [`TrackPool::expired`] until the next one
//! begins.

use crate::tracker::cost::{CostFn, similarity_matrix};
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, AssignmentResult, Detection};
use crate::tracker::rect::Rect;
use crate::tracker::track::TrackedObject;

/// Lifecycle limits shared by every strategy.
#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    /// A track is deleted once `time_since_update` exceeds this.
    pub max_age: u32,
    /// Consecutive hits required before a track is reported.
    pub min_hits: u32,
}

pub struct TrackPool<T: TrackedObject> {
    tracks: Vec<T>,
    expired: Vec<T>,
    params: T::Params,
    predicted: Vec<Rect>,
    next_id: u64,
    frame_count: u32,
    lifecycle: Lifecycle,
    cost: CostFn,
    kalman_filter: KalmanFilter,
}

impl<T: TrackedObject> TrackPool<T> {
    pub fn new(lifecycle: Lifecycle, cost: CostFn, params: T::Params) -> Self {
        Self {
            tracks: Vec::new(),
            expired: Vec::new(),
            params,
            predicted: Vec::new(),
            next_id: 0,
            frame_count: 0,
            lifecycle,
            cost,
            kalman_filter: KalmanFilter::default(),
        }
    }

    pub fn tracks(&self) -> &[T] {
        &self.tracks
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Tracks removed by the last frame, in their final state.
    pub fn expired(&mut self) -> &mut [T] {
        &mut self.expired
    }

    /// Drop every track and restart id allocation.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.expired.clear();
        self.predicted.clear();
        self.next_id = 0;
        self.frame_count = 0;
    }

    /// Predict all tracks one step ahead and drop those with invalid state.
    ///
    /// After this call track index `i` lines up with predicted box `i`.
    pub fn begin_frame(&mut self) {
        self.frame_count += 1;
        self.expired.clear();

        for t in self.tracks.iter_mut() {
            t.track_mut().predict(&self.kalman_filter);
        }

        let excised = self.expire_unless(|t| t.track().is_valid());
        if excised > 0 {
            log::debug!(
                "frame {}: excised {excised} tracks with non-finite state",
                self.frame_count
            );
        }

        self.predicted = self.tracks.iter().map(|t| t.track().rect()).collect();
    }

    /// Associate a subset of tracks with a subset of detections.
    ///
    /// `track_indices` and `detection_indices` select rows and columns; the
    /// returned result is expressed in those same global indices. Matched
    /// tracks are corrected with their detection.
    pub fn associate(
        &mut self,
        track_indices: &[usize],
        detections: &[Detection],
        detection_indices: &[usize],
        min_similarity: f32,
    ) -> AssignmentResult {
        let track_rects: Vec<Rect> = track_indices.iter().map(|&i| self.predicted[i]).collect();
        let det_rects: Vec<Rect> = detection_indices.iter().map(|&j| detections[j].bbox).collect();

        let sims = similarity_matrix(&track_rects, &det_rects, self.cost);
        let local = matching::linear_assignment(&sims, min_similarity);

        let result = AssignmentResult {
            matches: local
                .matches
                .iter()
                .map(|&(r, c)| (track_indices[r], detection_indices[c]))
                .collect(),
            unmatched_tracks: local.unmatched_tracks.iter().map(|&r| track_indices[r]).collect(),
            unmatched_detections: local
                .unmatched_detections
                .iter()
                .map(|&c| detection_indices[c])
                .collect(),
        };

        for &(itrack, idet) in &result.matches {
            self.tracks[itrack]
                .track_mut()
                .correct(&detections[idet], &self.kalman_filter);
        }

        result
    }

    /// Birth a new track for each selected detection.
    pub fn spawn(&mut self, detections: &[Detection], detection_indices: &[usize]) {
        for &idet in detection_indices {
            let id = self.allocate_id();
            let object = T::spawn(id, &detections[idet], &self.kalman_filter, &self.params);
            log::debug!("frame {}: new track {id}", self.frame_count);
            self.tracks.push(object);
        }
    }

    /// Expire stale tracks and return those eligible for reporting.
    pub fn finish_frame(&mut self) -> Vec<&mut T> {
        let max_age = self.lifecycle.max_age;
        let removed = self.expire_unless(|t| t.track().time_since_update <= max_age);
        if removed > 0 {
            log::debug!(
                "frame {}: removed {removed} tracks past max_age {max_age}",
                self.frame_count
            );
        }

        let min_hits = self.lifecycle.min_hits;
        let warming_up = self.frame_count <= min_hits;
        self.tracks
            .iter_mut()
            .filter(|t| {
                let track = t.track();
                track.time_since_update < 1 && (track.hit_streak >= min_hits || warming_up)
            })
            .collect()
    }

    /// Move every track failing `keep` to the expired list.
    fn expire_unless(&mut self, keep: impl Fn(&T) -> bool) -> usize {
        let (kept, gone): (Vec<T>, Vec<T>) =
            std::mem::take(&mut self.tracks).into_iter().partition(|t| keep(t));
        self.tracks = kept;
        let count = gone.len();
        self.expired.extend(gone);
        count
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}
