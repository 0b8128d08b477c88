//! Detection input type and association utilities.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::tracker::lap;
use crate::tracker::rect::{Rect, iou_batch};

/// Detection input for the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box, stored as TLWH and built from TLBR corners
    pub bbox: Rect,
    /// Detection confidence score in [0, 1]
    pub score: f32,
    /// Class label reported by the detector
    #[serde(default)]
    pub label: i32,
    /// Caller-defined correlation id, echoed back on the matching track
    #[serde(default)]
    pub detection_id: Option<i64>,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self::from_rect(Rect::from_tlbr(x1, y1, x2, y2), score)
    }

    pub fn from_rect(bbox: Rect, score: f32) -> Self {
        Self {
            bbox,
            score,
            label: 0,
            detection_id: None,
        }
    }

    pub fn with_label(mut self, label: i32) -> Self {
        self.label = label;
        self
    }

    pub fn with_detection_id(mut self, detection_id: i64) -> Self {
        self.detection_id = Some(detection_id);
        self
    }
}

/// Compute IoU distance (`1 - IoU`) matrix between tracks and detections.
///
/// When either side is empty the matrix has a zero dimension but still
/// records the length of the other side, so [`linear_assignment`] can route
/// every index to the unmatched lists.
pub fn iou_distance(track_boxes: &[Rect], det_boxes: &[Rect]) -> Array2<f32> {
    iou_batch(track_boxes, det_boxes).mapv_into(|iou| 1.0 - iou)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Optimal one-to-one assignment accepting only pairs with `cost < thresh`.
pub fn linear_assignment(cost_matrix: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: (0..num_cols).collect(),
        };
    }

    let row_to_col = lap::lapjv(cost_matrix, Some(thresh));

    let mut matches = vec![];
    let mut unmatched_tracks = vec![];
    let mut unmatched_detections_mask = vec![true; num_cols];

    for (row_idx, col_idx) in row_to_col.into_iter().enumerate() {
        match col_idx {
            Some(col_idx) if cost_matrix[[row_idx, col_idx]] < thresh => {
                matches.push((row_idx, col_idx));
                unmatched_detections_mask[col_idx] = false;
            }
            _ => unmatched_tracks.push(row_idx),
        }
    }

    let unmatched_detections = unmatched_detections_mask
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| u.then_some(i))
        .collect();

    AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections,
    }
}
