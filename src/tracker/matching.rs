//! Matching utilities for multi-object tracking.

use crate::tracker::rect::Rect;
use ndarray::Array2;

/// Detection input for the tracker.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Bounding box
    pub bbox: Rect,
    /// Detection confidence score
    pub score: f32,
    /// Detector class label
    pub class_id: u32,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            score,
            class_id: 0,
        }
    }

    pub fn from_rect(bbox: Rect, score: f32) -> Self {
        Self {
            bbox,
            score,
            class_id: 0,
        }
    }

    pub fn with_class(mut self, class_id: u32) -> Self {
        self.class_id = class_id;
        self
    }
}

/// Build a detection from a detector row `(x1, y1, x2, y2, confidence, class_id)`.
impl From<[f32; 6]> for Detection {
    fn from(row: [f32; 6]) -> Self {
        Detection::new(row[0], row[1], row[2], row[3], row[4]).with_class(row[5].max(0.0) as u32)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentResult {
    /// `(row, col)` pairs
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Solve the assignment between rows (tracks) and columns (detections)
/// maximizing total similarity.
///
/// Any solved pair whose similarity is below `min_similarity` is split back
/// into an unmatched track and an unmatched detection. Results are ordered by
/// row index, so ties are resolved the same way on every run.
pub fn linear_assignment(similarity: &Array2<f32>, min_similarity: f32) -> AssignmentResult {
    let (num_rows, num_cols) = similarity.dim();

    if num_rows == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: vec![],
            unmatched_detections: (0..num_cols).collect(),
        };
    }

    if num_cols == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: vec![],
        };
    }

    let row_to_col = match unambiguous_pairs(similarity, min_similarity) {
        Some(pairs) => pairs,
        None => solve_lapjv(similarity),
    };

    let mut matches = vec![];
    let mut unmatched_tracks = vec![];
    let mut unmatched_detections_mask: Vec<bool> = vec![true; num_cols];

    for (row_idx, col) in row_to_col.into_iter().enumerate() {
        match col {
            Some(col_idx) if similarity[[row_idx, col_idx]] >= min_similarity => {
                matches.push((row_idx, col_idx));
                unmatched_detections_mask[col_idx] = false;
            }
            _ => unmatched_tracks.push(row_idx),
        }
    }

    let unmatched_detections: Vec<usize> = unmatched_detections_mask
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| if u { Some(i) } else { None })
        .collect();

    AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections,
    }
}

/// When every row and column has at most one candidate above the threshold,
/// the optimal assignment is just those candidates.
fn unambiguous_pairs(similarity: &Array2<f32>, min_similarity: f32) -> Option<Vec<Option<usize>>> {
    let (num_rows, num_cols) = similarity.dim();
    let mut col_hits = vec![0usize; num_cols];
    let mut row_to_col = vec![None; num_rows];

    for i in 0..num_rows {
        for j in 0..num_cols {
            if similarity[[i, j]] >= min_similarity {
                if row_to_col[i].is_some() {
                    return None;
                }
                row_to_col[i] = Some(j);
                col_hits[j] += 1;
            }
        }
    }

    if col_hits.iter().any(|&hits| hits > 1) {
        return None;
    }
    Some(row_to_col)
}

fn solve_lapjv(similarity: &Array2<f32>) -> Vec<Option<usize>> {
    let (num_rows, num_cols) = similarity.dim();
    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), 1e6);

    for i in 0..num_rows {
        for j in 0..num_cols {
            padded[[i, j]] = 1.0 - similarity[[i, j]] as f64;
        }
    }

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => row_to_col
            .into_iter()
            .take(num_rows)
            .map(|col_idx| (col_idx < num_cols).then_some(col_idx))
            .collect(),
        Err(e) => {
            log::warn!("assignment solver failed ({e:?}), leaving {num_rows} tracks unmatched");
            vec![None; num_rows]
        }
    }
}
