//! Frame loop combining detection, tracking, violation rules and the
//! evidence hand-off.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{AppConfig, ZoneConfig};
use crate::error::Result;
use crate::evidence::{
    EvidenceQueue, EvidenceStore, EvidenceWorker, Frame, FrameRing, SubmitOutcome, WorkerStats,
};
use crate::tracker::{MultiObjectTracker, Rect};
use crate::violation::{
    LightState, Polygon, RedLightRule, RuleContext, Vehicle, ViolationManager, ViolationRule,
    ViolationStatus,
};

use super::{DetectionSource, PlateRecognizer};

/// A vehicle reported for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleReport {
    pub id: u64,
    pub class_id: u32,
    pub bbox: Rect,
    pub status: ViolationStatus,
    pub plate: Option<String>,
}

/// A violation confirmed during one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationNotice {
    pub vehicle_id: u64,
    pub identifier: String,
    pub violation_type: String,
}

/// Per-frame output of [`TrafficPipeline::process_frame`].
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub frame_index: u64,
    pub detections: usize,
    /// Reported vehicles that have entered the ROI.
    pub vehicles: Vec<VehicleReport>,
    pub violations: Vec<ViolationNotice>,
    /// Cumulative violations per rule.
    pub counts: Vec<(String, u64)>,
}

/// End-to-end red-light pipeline.
///
/// Frames go through detect, track, ROI activation and rule evaluation
/// strictly in order on the caller's thread. Only evidence persistence runs
/// elsewhere, on the worker behind the bounded queue.
pub struct TrafficPipeline<D: DetectionSource> {
    detector: D,
    tracker: Box<dyn MultiObjectTracker<Vehicle>>,
    roi: Polygon,
    manager: ViolationManager,
    ring: FrameRing,
    fps: f32,
    queue: EvidenceQueue,
    worker: Option<EvidenceWorker>,
    running: Arc<AtomicBool>,
    live_ids: HashSet<u64>,
}

impl<D: DetectionSource> TrafficPipeline<D> {
    /// Assemble a pipeline from already built parts and start the evidence
    /// worker on `store`.
    pub fn new<S>(
        detector: D,
        tracker: Box<dyn MultiObjectTracker<Vehicle>>,
        roi: Polygon,
        manager: ViolationManager,
        config: &AppConfig,
        store: S,
    ) -> Self
    where
        S: EvidenceStore + 'static,
    {
        let settings = &config.violation;
        let queue = EvidenceQueue::bounded(settings.evidence_queue_capacity);
        let worker = queue.spawn_worker(store);

        Self {
            detector,
            tracker,
            roi,
            manager,
            ring: FrameRing::for_duration(settings.fps, settings.video_proof_duration),
            fps: settings.fps,
            queue,
            worker: Some(worker),
            running: Arc::new(AtomicBool::new(true)),
            live_ids: HashSet::new(),
        }
    }

    /// Build everything from configuration for frames of the given size.
    ///
    /// Fails on an unusable rule set before any frame is processed.
    pub fn from_config<S>(
        detector: D,
        recognizer: Option<Box<dyn PlateRecognizer>>,
        config: &AppConfig,
        zone: &ZoneConfig,
        frame_width: u32,
        frame_height: u32,
        store: S,
    ) -> Result<Self>
    where
        S: EvidenceStore + 'static,
    {
        let settings = &config.violation;
        settings.validate()?;

        let rule = RedLightRule::from_zone(zone, frame_width, frame_height, settings)?;
        let roi = rule.roi().clone();
        let rules: Vec<Box<dyn ViolationRule>> = vec![Box::new(rule)];

        let mut manager =
            ViolationManager::new(rules).with_min_plate_length(settings.min_plate_length);
        if let Some(recognizer) = recognizer {
            manager = manager.with_recognizer(recognizer);
        }

        let tracker = config.tracking.build::<Vehicle>(settings.vehicle_params());
        log::info!(
            "pipeline ready: {} tracker, {}x{} frames at {} fps",
            config.tracking.strategy_name(),
            frame_width,
            frame_height,
            settings.fps
        );

        Ok(Self::new(detector, tracker, roi, manager, config, store))
    }

    /// Run one frame through the pipeline.
    ///
    /// Never fails: a detector error is logged and the frame is tracked with
    /// no detections.
    pub fn process_frame(&mut self, frame: Arc<Frame>, lights: LightState) -> FrameReport {
        let detections = match self.detector.detect(&frame) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("frame {}: detector failed, tracking empty frame: {e}", frame.index());
                Vec::new()
            }
        };

        let mut reported = self.tracker.update(&detections);
        for vehicle in reported.iter_mut() {
            if self.roi.contains_rect(&vehicle.rect()) {
                vehicle.activate();
            }
        }
        let mut active: Vec<&mut Vehicle> =
            reported.into_iter().filter(|v| v.is_active()).collect();

        self.ring.push(Arc::clone(&frame));

        let ctx = RuleContext {
            frame: &frame,
            lights,
            frame_window: &self.ring,
            fps: self.fps,
            plates_expected: self.manager.has_recognizer(),
        };
        let mut jobs = self.manager.update(&mut active, &ctx);

        let vehicles = active
            .iter()
            .map(|v| VehicleReport {
                id: v.id(),
                class_id: v.class_id(),
                bbox: v.rect(),
                status: v.status(),
                plate: v.plate().map(str::to_owned),
            })
            .collect();
        drop(active);

        let expired = self.tracker.expired();
        if !expired.is_empty() {
            jobs.extend(self.manager.finalize_expired(expired, &ctx));
        }
        self.retire_lost_tracks();

        let mut violations = Vec::with_capacity(jobs.len());
        for job in jobs {
            violations.push(ViolationNotice {
                vehicle_id: job.vehicle_id,
                identifier: job.identifier.clone(),
                violation_type: job.violation_type.clone(),
            });
            match self.queue.submit(job) {
                SubmitOutcome::Queued | SubmitOutcome::QueuedDroppingOldest => {}
                SubmitOutcome::Disconnected => {
                    log::error!("evidence worker is gone, violation evidence lost");
                }
            }
        }

        FrameReport {
            frame_index: frame.index(),
            detections: detections.len(),
            vehicles,
            violations,
            counts: self.manager.counts(),
        }
    }

    /// Process frames until the source ends or the running flag is cleared.
    ///
    /// The flag is checked between frames only. Returns the number of frames
    /// processed.
    pub fn run<I, F>(&mut self, frames: I, mut on_report: F) -> u64
    where
        I: IntoIterator<Item = (Arc<Frame>, LightState)>,
        F: FnMut(FrameReport),
    {
        let mut processed = 0;
        for (frame, lights) in frames {
            if !self.is_running() {
                log::info!("stop requested after {processed} frames");
                break;
            }
            on_report(self.process_frame(frame, lights));
            processed += 1;
        }
        processed
    }

    /// Handle for stopping [`TrafficPipeline::run`] from another thread.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn tracker(&self) -> &dyn MultiObjectTracker<Vehicle> {
        self.tracker.as_ref()
    }

    pub fn manager(&self) -> &ViolationManager {
        &self.manager
    }

    pub fn roi(&self) -> &Polygon {
        &self.roi
    }

    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Jobs evicted from the full evidence queue so far.
    pub fn dropped_evidence(&self) -> u64 {
        self.queue.dropped()
    }

    /// Stop the frame loop, let the worker drain what is queued and wait
    /// for it.
    pub fn shutdown(mut self) -> WorkerStats {
        self.stop();
        self.stop_worker().unwrap_or_default()
    }

    fn stop_worker(&mut self) -> Option<WorkerStats> {
        let worker = self.worker.take()?;
        self.queue.stop();
        let stats = worker.join();
        log::info!(
            "evidence worker stopped: {} persisted, {} failed, {} dropped",
            stats.persisted,
            stats.failed,
            self.queue.dropped()
        );
        Some(stats)
    }

    fn retire_lost_tracks(&mut self) {
        let current: HashSet<u64> = self.tracker.tracks().iter().map(|v| v.id()).collect();
        let lost: Vec<u64> = self.live_ids.difference(&current).copied().collect();
        if !lost.is_empty() {
            log::debug!("retiring {} lost tracks", lost.len());
            self.manager.retire(&lost);
        }
        self.live_ids = current;
    }
}

impl<D: DetectionSource> Drop for TrafficPipeline<D> {
    fn drop(&mut self) {
        self.stop_worker();
    }
}
