//! Red-light running at a signalized stop line.
//!
//! Crossing an offending line only marks a vehicle pending. Exception lines
//! crossed later, anywhere inside the ROI, can still cancel or reclassify it;
//! the verdict is taken when the vehicle leaves the ROI.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{ViolationSettings, ZoneConfig};
use crate::error::{Error, Result};
use crate::evidence::EvidenceJob;
use crate::tracker::Rect;
use crate::violation::light::LightColor;
use crate::violation::rule::{RuleContext, ViolationRule};
use crate::violation::vehicle::Vehicle;
use crate::violation::zone::{LineCategory, LineSegment, LineSet, Polygon};

pub const RED_LIGHT: &str = "Red Light";
pub const RED_LIGHT_TURNING: &str = "Red Light - Turning";

#[derive(Debug, Clone)]
pub struct RedLightOptions {
    /// Pixels added around the box in the proof crop.
    pub padding: u32,
    /// Frames a pending vehicle outside the ROI waits for a plate before
    /// its track id is used instead.
    pub plate_wait_frames: u32,
}

impl Default for RedLightOptions {
    fn default() -> Self {
        Self {
            padding: 30,
            plate_wait_frames: 15,
        }
    }
}

impl From<&ViolationSettings> for RedLightOptions {
    fn from(settings: &ViolationSettings) -> Self {
        Self {
            padding: settings.padding,
            plate_wait_frames: settings.plate_wait_frames,
        }
    }
}

pub struct RedLightRule {
    name: String,
    roi: Polygon,
    violation: LineSet,
    special_violation: LineSet,
    left_exception: LineSet,
    right_exception: LineSet,
    other_exception: LineSet,
    options: RedLightOptions,
}

#[derive(Debug, Default)]
struct Crossed {
    violation: bool,
    special_violation: bool,
    left_exception: bool,
    right_exception: bool,
    other_exception: bool,
}

impl RedLightRule {
    /// Build a rule from explicit geometry.
    ///
    /// Fails when neither violation nor special-violation lines are given,
    /// since such a rule could never fire.
    pub fn new(
        name: impl Into<String>,
        roi: Polygon,
        lines: &BTreeMap<LineCategory, Vec<LineSegment>>,
        options: RedLightOptions,
    ) -> Result<Self> {
        let set = |category: LineCategory| {
            let mut set = LineSet::default();
            for segment in lines.get(&category).into_iter().flatten() {
                set.push(*segment);
            }
            set
        };

        let rule = Self {
            name: name.into(),
            roi,
            violation: set(LineCategory::Violation),
            special_violation: set(LineCategory::SpecialViolation),
            left_exception: set(LineCategory::LeftException),
            right_exception: set(LineCategory::RightException),
            other_exception: set(LineCategory::OtherException),
            options,
        };

        if rule.violation.is_empty() && rule.special_violation.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "rule '{}' has no violation or special violation lines",
                rule.name
            )));
        }

        log::info!(
            "rule '{}': {} violation, {} special, {}/{}/{} exception lines",
            rule.name,
            rule.violation.len(),
            rule.special_violation.len(),
            rule.left_exception.len(),
            rule.right_exception.len(),
            rule.other_exception.len()
        );
        Ok(rule)
    }

    /// Build a rule from a zone file, for frames of the given size.
    pub fn from_zone(
        zone: &ZoneConfig,
        frame_width: u32,
        frame_height: u32,
        settings: &ViolationSettings,
    ) -> Result<Self> {
        Self::new(
            "RedLightViolation",
            zone.roi(frame_width, frame_height),
            &zone.lines(),
            RedLightOptions::from(settings),
        )
    }

    pub fn roi(&self) -> &Polygon {
        &self.roi
    }

    fn trigger(&mut self, track_id: u64, rect: &Rect) -> Crossed {
        Crossed {
            violation: self.violation.trigger(track_id, rect),
            special_violation: self.special_violation.trigger(track_id, rect),
            left_exception: self.left_exception.trigger(track_id, rect),
            right_exception: self.right_exception.trigger(track_id, rect),
            other_exception: self.other_exception.trigger(track_id, rect),
        }
    }

    fn finalize_on_exit(
        &self,
        vehicle: &mut Vehicle,
        rect: &Rect,
        ctx: &RuleContext<'_>,
    ) -> Option<EvidenceJob> {
        if !vehicle.is_pending() {
            return None;
        }
        if self.roi.contains_rect(rect) {
            vehicle.reset_outside_roi();
            return None;
        }

        let waited = vehicle.tick_outside_roi();
        let awaiting_plate = ctx.plates_expected && vehicle.plate().is_none();
        if awaiting_plate && waited <= self.options.plate_wait_frames {
            return None;
        }
        self.confirm(vehicle, rect, ctx)
    }

    /// Confirm a pending vehicle from its crossing snapshot.
    fn confirm(
        &self,
        vehicle: &mut Vehicle,
        rect: &Rect,
        ctx: &RuleContext<'_>,
    ) -> Option<EvidenceJob> {
        let (frame, bbox, straight_light) = match vehicle.snapshot() {
            Some(snapshot) => (
                Arc::clone(&snapshot.frame),
                snapshot.bbox,
                snapshot.straight_light,
            ),
            None => (Arc::clone(ctx.frame), *rect, ctx.lights.effective_straight()),
        };
        let label = if vehicle.going_straight() && straight_light == Some(LightColor::Red) {
            RED_LIGHT
        } else {
            RED_LIGHT_TURNING
        };

        vehicle.mark_violation(
            label,
            &frame,
            bbox,
            ctx.frame_window.snapshot(),
            ctx.fps,
            self.options.padding,
        )
    }
}

fn exception_crossing(
    vehicle: &mut Vehicle,
    light: Option<LightColor>,
    rect: Rect,
    ctx: &RuleContext<'_>,
) {
    if light == Some(LightColor::Red) {
        log::debug!("vehicle {} turned against a red arrow", vehicle.id());
        vehicle.begin_turn_violation(ctx.frame, rect, ctx.lights.effective_straight());
    } else {
        vehicle.clear_pending();
    }
}

impl ViolationRule for RedLightRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(
        &mut self,
        vehicles: &mut [&mut Vehicle],
        ctx: &RuleContext<'_>,
    ) -> Vec<EvidenceJob> {
        let mut jobs = Vec::new();
        let straight = ctx.lights.effective_straight();

        for vehicle in vehicles.iter_mut() {
            let vehicle: &mut Vehicle = vehicle;
            let rect = vehicle.rect();
            let crossed = self.trigger(vehicle.id(), &rect);

            if vehicle.is_confirmed() {
                continue;
            }

            if crossed.violation {
                if straight == Some(LightColor::Red) {
                    log::debug!("vehicle {} crossed the stop line on red", vehicle.id());
                    vehicle.begin_violation(ctx.frame, rect, straight);
                } else {
                    log::debug!("vehicle {} crossed the stop line on {straight:?}", vehicle.id());
                }
            }
            if crossed.special_violation {
                log::debug!("vehicle {} crossed a special violation line", vehicle.id());
                vehicle.begin_turn_violation(ctx.frame, rect, straight);
            }
            if crossed.left_exception {
                exception_crossing(vehicle, ctx.lights.effective_left(), rect, ctx);
            }
            if crossed.right_exception {
                exception_crossing(vehicle, Some(ctx.lights.effective_right()), rect, ctx);
            }
            if crossed.other_exception {
                vehicle.clear_pending();
            }

            if let Some(job) = self.finalize_on_exit(vehicle, &rect, ctx) {
                jobs.push(job);
            }
        }

        jobs
    }

    /// A pending vehicle last seen outside the ROI is confirmed with
    /// whatever identity it has when its track is deleted. One that vanished
    /// inside the ROI is dropped.
    fn finalize_expired(
        &mut self,
        vehicle: &mut Vehicle,
        ctx: &RuleContext<'_>,
    ) -> Option<EvidenceJob> {
        if !vehicle.is_pending() || vehicle.frames_outside_roi() == 0 {
            return None;
        }
        log::debug!("vehicle {} lost after leaving the ROI, confirming", vehicle.id());
        let rect = vehicle.rect();
        self.confirm(vehicle, &rect, ctx)
    }

    fn retire(&mut self, track_id: u64) {
        for set in [
            &mut self.violation,
            &mut self.special_violation,
            &mut self.left_exception,
            &mut self.right_exception,
            &mut self.other_exception,
        ] {
            set.forget(track_id);
        }
    }
}
