//! Tracked vehicle: motion track plus violation and plate state.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::SystemTime;

use crate::evidence::{EvidenceJob, Frame};
use crate::tracker::{Detection, KalmanFilter, Rect, Track, TrackedObject};
use crate::violation::light::LightColor;
use crate::violation::plate::{DEFAULT_VOTE_THRESHOLD, PlateConsensus};

const MAX_HISTORY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViolationStatus {
    #[default]
    NotViolated,
    /// Crossed an offending line; verdict deferred until the ROI is left.
    Pending,
    /// Evidence emitted. Terminal for the lifetime of the track.
    Confirmed,
}

/// Frame and box captured at the offending crossing.
#[derive(Debug, Clone)]
pub struct CrossingSnapshot {
    pub frame: Arc<Frame>,
    pub bbox: Rect,
    /// Straight-ahead signal at the instant of crossing.
    pub straight_light: Option<LightColor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViolationRecord {
    pub violation_type: String,
    pub timestamp: SystemTime,
}

/// Settings applied to every vehicle a tracker spawns.
#[derive(Debug, Clone)]
pub struct VehicleParams {
    pub vote_threshold: u32,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            vote_threshold: DEFAULT_VOTE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    track: Track,
    status: ViolationStatus,
    going_straight: bool,
    snapshot: Option<CrossingSnapshot>,
    plate: PlateConsensus,
    history: VecDeque<ViolationRecord>,
    active: bool,
    frames_outside_roi: u32,
}

impl Vehicle {
    pub fn new(track: Track, params: &VehicleParams) -> Self {
        Self {
            track,
            status: ViolationStatus::NotViolated,
            going_straight: true,
            snapshot: None,
            plate: PlateConsensus::new(params.vote_threshold),
            history: VecDeque::new(),
            active: false,
            frames_outside_roi: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.track.track_id
    }

    pub fn class_id(&self) -> u32 {
        self.track.class_id
    }

    pub fn rect(&self) -> Rect {
        self.track.rect()
    }

    pub fn status(&self) -> ViolationStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == ViolationStatus::Pending
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == ViolationStatus::Confirmed
    }

    pub fn going_straight(&self) -> bool {
        self.going_straight
    }

    pub fn snapshot(&self) -> Option<&CrossingSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn plate(&self) -> Option<&str> {
        self.plate.resolved()
    }

    pub fn plate_consensus(&self) -> &PlateConsensus {
        &self.plate
    }

    pub fn history(&self) -> impl Iterator<Item = &ViolationRecord> {
        self.history.iter()
    }

    /// Whether the vehicle has ever been seen inside the ROI.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activate(&mut self) {
        if !self.active {
            log::debug!("vehicle {} entered the ROI", self.id());
            self.active = true;
        }
    }

    /// Count one vote for a recognizer read.
    pub fn update_plate(&mut self, candidate: Option<&str>) -> Option<&str> {
        self.plate.vote(candidate)
    }

    /// Record an offending crossing and move to pending.
    pub fn begin_violation(
        &mut self,
        frame: &Arc<Frame>,
        bbox: Rect,
        straight_light: Option<LightColor>,
    ) {
        if self.is_confirmed() {
            return;
        }
        self.status = ViolationStatus::Pending;
        self.snapshot = Some(CrossingSnapshot {
            frame: Arc::clone(frame),
            bbox,
            straight_light,
        });
    }

    /// Offending crossing that is a turn rather than a straight run.
    pub fn begin_turn_violation(
        &mut self,
        frame: &Arc<Frame>,
        bbox: Rect,
        straight_light: Option<LightColor>,
    ) {
        if self.is_confirmed() {
            return;
        }
        self.going_straight = false;
        self.begin_violation(frame, bbox, straight_light);
    }

    /// Cancel a pending violation after an exempt maneuver.
    pub fn clear_pending(&mut self) {
        if !self.is_pending() {
            return;
        }
        log::debug!("vehicle {} pending violation cleared", self.id());
        self.status = ViolationStatus::NotViolated;
        self.snapshot = None;
        self.going_straight = true;
        self.frames_outside_roi = 0;
    }

    /// Count a frame spent outside the ROI, returning the running total.
    pub fn tick_outside_roi(&mut self) -> u32 {
        self.frames_outside_roi += 1;
        self.frames_outside_roi
    }

    pub fn reset_outside_roi(&mut self) {
        self.frames_outside_roi = 0;
    }

    pub fn frames_outside_roi(&self) -> u32 {
        self.frames_outside_roi
    }

    /// Finalize a violation and build its evidence.
    ///
    /// Returns `None` once the vehicle is already confirmed, so repeated
    /// calls never produce a second job. The identifier is the resolved
    /// plate, or the track id when no plate resolved.
    pub fn mark_violation(
        &mut self,
        label: &str,
        frame: &Arc<Frame>,
        bbox: Rect,
        frame_window: Vec<Arc<Frame>>,
        fps: f32,
        padding: u32,
    ) -> Option<EvidenceJob> {
        if self.is_confirmed() {
            return None;
        }

        let timestamp = SystemTime::now();
        let identifier = match self.plate() {
            Some(plate) => plate.to_owned(),
            None => self.id().to_string(),
        };

        self.status = ViolationStatus::Confirmed;
        if self.history.len() == MAX_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(ViolationRecord {
            violation_type: label.to_owned(),
            timestamp,
        });

        log::info!(
            "vehicle {} confirmed violation '{label}' as {identifier}",
            self.id()
        );

        Some(EvidenceJob {
            vehicle_id: self.id(),
            identifier,
            violation_type: label.to_owned(),
            class_id: self.class_id(),
            proof_crop: frame.crop(&bbox, padding),
            frame: Arc::clone(frame),
            bbox,
            frame_window,
            fps,
            timestamp,
        })
    }
}

impl TrackedObject for Vehicle {
    type Params = VehicleParams;

    fn spawn(
        track_id: u64,
        detection: &Detection,
        kalman_filter: &KalmanFilter,
        params: &VehicleParams,
    ) -> Self {
        Vehicle::new(Track::new(track_id, detection, kalman_filter), params)
    }

    fn track(&self) -> &Track {
        &self.track
    }

    fn track_mut(&mut self) -> &mut Track {
        &mut self.track
    }
}
