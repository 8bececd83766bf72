use std::sync::Arc;

use crate::evidence::{EvidenceJob, Frame, FrameRing};
use crate::violation::light::LightState;
use crate::violation::vehicle::Vehicle;

/// Everything a rule sees about the current frame besides the vehicles.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    pub frame: &'a Arc<Frame>,
    pub lights: LightState,
    /// Recent frames, snapshot into evidence when a violation is confirmed.
    pub frame_window: &'a FrameRing,
    pub fps: f32,
    /// Whether a plate recognizer feeds the vehicles. Without one no plate
    /// can ever resolve, so there is nothing worth waiting for.
    pub plates_expected: bool,
}

/// One independently configured violation check.
///
/// Rules own their geometry and per-track memory and share nothing with
/// each other. Per-vehicle state lives on the [`Vehicle`].
pub trait ViolationRule {
    fn name(&self) -> &str;

    /// Evaluate the vehicles active this frame and return evidence for every
    /// violation confirmed by this call.
    fn evaluate(
        &mut self,
        vehicles: &mut [&mut Vehicle],
        ctx: &RuleContext<'_>,
    ) -> Vec<EvidenceJob>;

    /// Last chance for a vehicle whose track was just deleted.
    fn finalize_expired(
        &mut self,
        _vehicle: &mut Vehicle,
        _ctx: &RuleContext<'_>,
    ) -> Option<EvidenceJob> {
        None
    }

    /// Drop any memory kept for a track that no longer exists.
    fn retire(&mut self, _track_id: u64) {}
}
