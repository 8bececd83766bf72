use crate::evidence::EvidenceJob;
use crate::integration::PlateRecognizer;
use crate::violation::plate::normalize_candidate;
use crate::violation::rule::{RuleContext, ViolationRule};
use crate::violation::vehicle::Vehicle;

pub const DEFAULT_MIN_PLATE_LENGTH: usize = 3;

struct RuleSlot {
    rule: Box<dyn ViolationRule>,
    violations: u64,
}

impl RuleSlot {
    fn record(&mut self, confirmed: Vec<EvidenceJob>) -> Vec<EvidenceJob> {
        if !confirmed.is_empty() {
            self.violations += confirmed.len() as u64;
            log::info!(
                "rule '{}': {} new violations, {} total",
                self.rule.name(),
                confirmed.len(),
                self.violations
            );
        }
        confirmed
    }
}

/// Runs an ordered list of independent rules over the active vehicles.
///
/// Before the rules run, vehicles with a pending violation and no resolved
/// plate get one recognizer read each.
pub struct ViolationManager {
    rules: Vec<RuleSlot>,
    recognizer: Option<Box<dyn PlateRecognizer>>,
    min_plate_length: usize,
}

impl ViolationManager {
    pub fn new(rules: Vec<Box<dyn ViolationRule>>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|rule| RuleSlot { rule, violations: 0 })
                .collect(),
            recognizer: None,
            min_plate_length: DEFAULT_MIN_PLATE_LENGTH,
        }
    }

    pub fn with_recognizer(mut self, recognizer: Box<dyn PlateRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_min_plate_length(mut self, min_plate_length: usize) -> Self {
        self.min_plate_length = min_plate_length;
        self
    }

    pub fn has_recognizer(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Evaluate one frame and return the evidence for every confirmed
    /// violation, in rule order.
    pub fn update(
        &mut self,
        vehicles: &mut [&mut Vehicle],
        ctx: &RuleContext<'_>,
    ) -> Vec<EvidenceJob> {
        let ctx = &RuleContext {
            plates_expected: self.has_recognizer(),
            ..*ctx
        };

        if let Some(recognizer) = self.recognizer.as_mut() {
            for vehicle in vehicles.iter_mut() {
                if !vehicle.is_pending() || vehicle.plate().is_some() {
                    continue;
                }
                let candidate = recognizer
                    .recognize(&vehicle.rect(), ctx.frame)
                    .and_then(|raw| normalize_candidate(&raw, self.min_plate_length));
                let id = vehicle.id();
                if let Some(plate) = vehicle.update_plate(candidate.as_deref()) {
                    log::debug!("vehicle {id} plate resolved to {plate}");
                }
            }
        }

        let mut jobs = Vec::new();
        for slot in &mut self.rules {
            let confirmed = slot.rule.evaluate(vehicles, ctx);
            jobs.extend(slot.record(confirmed));
        }
        jobs
    }

    /// Give every rule a last look at vehicles whose tracks were deleted
    /// this frame.
    pub fn finalize_expired(
        &mut self,
        vehicles: &mut [Vehicle],
        ctx: &RuleContext<'_>,
    ) -> Vec<EvidenceJob> {
        let mut jobs = Vec::new();
        for slot in &mut self.rules {
            let confirmed: Vec<EvidenceJob> = vehicles
                .iter_mut()
                .filter_map(|vehicle| slot.rule.finalize_expired(vehicle, ctx))
                .collect();
            jobs.extend(slot.record(confirmed));
        }
        jobs
    }

    /// Forget tracks that the tracker dropped.
    pub fn retire(&mut self, track_ids: &[u64]) {
        for slot in &mut self.rules {
            for &id in track_ids {
                slot.rule.retire(id);
            }
        }
    }

    /// Cumulative violation count per rule, in rule order.
    pub fn counts(&self) -> Vec<(String, u64)> {
        self.rules
            .iter()
            .map(|slot| (slot.rule.name().to_owned(), slot.violations))
            .collect()
    }

    pub fn total(&self) -> u64 {
        self.rules.iter().map(|slot| slot.violations).sum()
    }
}
