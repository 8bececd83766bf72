//! Similarity metrics used to build association matrices.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::tracker::rect::Rect;

/// Pairwise similarity between a predicted track box and a detection box.
pub type CostFn = fn(&Rect, &Rect) -> f32;

/// Configured similarity metric, resolved once into a [`CostFn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostFunction {
    #[default]
    Iou,
    Diou,
    Ciou,
}

impl CostFunction {
    pub fn resolve(self) -> CostFn {
        match self {
            CostFunction::Iou => Rect::iou,
            CostFunction::Diou => Rect::diou,
            CostFunction::Ciou => Rect::ciou,
        }
    }
}

/// Calculate the similarity matrix between two sets of bounding boxes.
///
/// Returns a matrix of shape (M, N) where M is the length of `boxes_a`
/// and N is the length of `boxes_b`.
pub fn similarity_matrix(boxes_a: &[Rect], boxes_b: &[Rect], cost: CostFn) -> Array2<f32> {
    let mut sims = Array2::zeros((boxes_a.len(), boxes_b.len()));
    for (i, a) in boxes_a.iter().enumerate() {
        for (j, b) in boxes_b.iter().enumerate() {
            sims[[i, j]] = cost(a, b);
        }
    }
    sims
}
