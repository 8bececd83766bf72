use std::sync::Arc;
use std::time::SystemTime;

use crate::evidence::frame::Frame;
use crate::tracker::Rect;

/// Proof artifacts for one confirmed violation.
///
/// Built once by [`crate::Vehicle::mark_violation`] and moved into the
/// hand-off queue; nothing downstream mutates it.
#[derive(Debug, Clone)]
pub struct EvidenceJob {
    pub vehicle_id: u64,
    /// Resolved plate text, or the vehicle id when no plate resolved.
    pub identifier: String,
    pub violation_type: String,
    pub class_id: u32,
    /// Full frame captured when the offending crossing was recorded.
    pub frame: Arc<Frame>,
    /// Padded still crop around `bbox`, absent when the box left the frame.
    pub proof_crop: Option<Frame>,
    pub bbox: Rect,
    /// Recent frames leading up to confirmation, oldest first.
    pub frame_window: Vec<Arc<Frame>>,
    pub fps: f32,
    pub timestamp: SystemTime,
}

impl EvidenceJob {
    /// Seconds since the Unix epoch, used for artifact names.
    pub fn unix_seconds(&self) -> u64 {
        self.timestamp
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }

    /// Violation label made safe for file and object names.
    pub fn label_slug(&self) -> String {
        slug(&self.violation_type)
    }

    /// Identifier made safe for file names. Plate text comes straight from
    /// the recognizer and may hold separators or `..`.
    pub fn identifier_slug(&self) -> String {
        slug(&self.identifier)
    }
}

fn slug(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
