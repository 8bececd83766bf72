//! Fluent construction of [`Detection`]s from detector heads that report
//! boxes in different layouts.

use crate::tracker::{Detection, Rect};

#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    bbox: Rect,
    score: f32,
    class_id: u32,
}

impl DetectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Corners `(x1, y1, x2, y2)`.
    pub fn tlbr(self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.rect(Rect::from_tlbr(x1, y1, x2, y2))
    }

    /// Center, width and height, as YOLO-style heads emit them.
    pub fn xywh(self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.rect(Rect::new(cx - w / 2.0, cy - h / 2.0, w, h))
    }

    pub fn tlwh(self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.rect(Rect::new(x, y, w, h))
    }

    pub fn rect(mut self, bbox: Rect) -> Self {
        self.bbox = bbox;
        self
    }

    pub fn score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Detector class label (car, motorbike, ...).
    pub fn class_id(mut self, class_id: u32) -> Self {
        self.class_id = class_id;
        self
    }

    pub fn build(self) -> Detection {
        Detection::from_rect(self.bbox, self.score).with_class(self.class_id)
    }
}
