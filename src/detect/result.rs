use serde::{Deserialize, Serialize};

/// One predicted colony bounding box, in frame pixel coordinates.
///
/// `(x1, y1)` is the top-left corner, `(x2, y2)` the bottom-right. A cycle's
/// reported count is the length of the detection list; order carries no
/// meaning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Model confidence, absent for heuristic backends.
    pub score: Option<f32>,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            score: None,
        }
    }

    pub fn with_score(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            score: Some(score),
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection-over-union with another box.
    pub fn iou(&self, other: &Detection) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let iw = (ix2 - ix1).max(0.0);
        let ih = (iy2 - iy1).max(0.0);
        let intersection = iw * ih;

        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// Greedy non-maximum suppression.
///
/// Keeps the highest-scoring box of each overlapping cluster; boxes without a
/// score rank lowest. Returns the survivors ordered by descending score.
pub fn non_max_suppress(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        let sa = a.score.unwrap_or(0.0);
        let sb = b.score.unwrap_or(0.0);
        sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        if kept.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = Detection::new(0.0, 0.0, 10.0, 10.0);
        let b = Detection::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = Detection::new(5.0, 5.0, 15.0, 15.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = Detection::new(0.0, 0.0, 10.0, 10.0);
        let b = Detection::new(5.0, 0.0, 15.0, 10.0);
        // intersection 50, union 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_boxes_have_zero_iou() {
        let a = Detection::new(5.0, 5.0, 5.0, 5.0);
        let b = Detection::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn nms_collapses_overlapping_cluster() {
        let detections = vec![
            Detection::with_score(0.0, 0.0, 10.0, 10.0, 0.9),
            Detection::with_score(1.0, 1.0, 11.0, 11.0, 0.8),
            Detection::with_score(40.0, 40.0, 50.0, 50.0, 0.7),
        ];
        let kept = non_max_suppress(detections, 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, Some(0.9));
        assert_eq!(kept[1].score, Some(0.7));
    }

    #[test]
    fn nms_keeps_disjoint_boxes() {
        let detections = vec![
            Detection::with_score(0.0, 0.0, 10.0, 10.0, 0.5),
            Detection::with_score(20.0, 0.0, 30.0, 10.0, 0.6),
            Detection::with_score(0.0, 20.0, 10.0, 30.0, 0.7),
        ];
        let kept = non_max_suppress(detections, 0.45);
        assert_eq!(kept.len(), 3);
    }
}
