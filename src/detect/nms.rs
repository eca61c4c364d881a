use crate::detect::result::BoundingBox;

/// Default overlap at which a lower-confidence box is discarded.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.5;

/// Greedy, class-agnostic non-max suppression.
///
/// Boxes are taken in descending confidence order; every remaining box whose
/// IoU with a kept box is `>= iou_threshold` is discarded, whatever its class.
/// The result is ordered by confidence.
pub fn apply_nms(mut boxes: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    // Stable: equal confidences keep decode order.
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<BoundingBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if keep
            .iter()
            .all(|kept| iou(kept, &candidate) < iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

/// Intersection over union, with areas taken from each box's `w * h`.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.w * a.h + b.w * b.h - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
