//! Majority vote over noisy licence-plate reads.

use std::collections::BTreeMap;

pub const DEFAULT_VOTE_THRESHOLD: u32 = 3;

/// Vote tally owned by a single vehicle.
///
/// The leader is recomputed on every vote, so a candidate that later
/// overtakes the resolved plate replaces it.
#[derive(Debug, Clone)]
pub struct PlateConsensus {
    votes: BTreeMap<String, u32>,
    threshold: u32,
    resolved: Option<String>,
}

impl Default for PlateConsensus {
    fn default() -> Self {
        Self::new(DEFAULT_VOTE_THRESHOLD)
    }
}

impl PlateConsensus {
    pub fn new(threshold: u32) -> Self {
        Self {
            votes: BTreeMap::new(),
            threshold: threshold.max(1),
            resolved: None,
        }
    }

    /// Count one read. `None` is a miss and changes nothing.
    ///
    /// Returns the resolved plate after the vote.
    pub fn vote(&mut self, candidate: Option<&str>) -> Option<&str> {
        if let Some(candidate) = candidate {
            *self.votes.entry(candidate.to_owned()).or_insert(0) += 1;
            self.recompute();
        }
        self.resolved()
    }

    pub fn resolved(&self) -> Option<&str> {
        self.resolved.as_deref()
    }

    pub fn votes(&self, candidate: &str) -> u32 {
        self.votes.get(candidate).copied().unwrap_or(0)
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    fn recompute(&mut self) {
        // Ties keep the current plate, otherwise the smallest string wins.
        let mut leader: Option<(&String, u32)> = None;
        for (plate, &count) in &self.votes {
            let better = match leader {
                None => true,
                Some((_, best)) if count > best => true,
                Some((_, best)) if count == best => self.resolved.as_ref() == Some(plate),
                _ => false,
            };
            if better {
                leader = Some((plate, count));
            }
        }

        let Some((plate, count)) = leader else {
            return;
        };
        if count < self.threshold || self.resolved.as_ref() == Some(plate) {
            return;
        }
        if let Some(previous) = &self.resolved {
            log::info!("plate consensus moved from {previous} to {plate}");
        }
        self.resolved = Some(plate.clone());
    }
}

/// Clean a raw recognizer read.
///
/// Whitespace is trimmed; reads of `min_length` characters or fewer are
/// treated as misses.
pub fn normalize_candidate(raw: &str, min_length: usize) -> Option<String> {
    let trimmed = raw.trim();
    (trimmed.chars().count() > min_length).then(|| trimmed.to_owned())
}
