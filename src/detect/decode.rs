use std::sync::Arc;

use crate::detect::result::{BoundingBox, ModelShape, RawDetectionTensor};

/// Default minimum class confidence for a candidate box.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;

/// Decoder configuration failures. The frame is skipped, the session continues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// One of the cached shape dimensions is zero.
    UninitializedShape(ModelShape),
    /// The tensor handed over does not match the cached shape.
    ShapeMismatch {
        expected_channels: usize,
        expected_elements: usize,
        channels: usize,
        elements: usize,
    },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::UninitializedShape(shape) => write!(
                f,
                "invalid tensor shape configuration: width={} height={} channels={} elements={}",
                shape.tensor_width, shape.tensor_height, shape.num_channels, shape.num_elements
            ),
            DecodeError::ShapeMismatch {
                expected_channels,
                expected_elements,
                channels,
                elements,
            } => write!(
                f,
                "detection tensor is {}x{}, model shape is {}x{}",
                channels, elements, expected_channels, expected_elements
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Turns raw `[1, C, N]` detector output into candidate boxes.
#[derive(Clone, Debug)]
pub struct BoxDecoder {
    labels: Arc<[String]>,
    confidence_threshold: f32,
}

impl BoxDecoder {
    pub fn new(labels: impl Into<Arc<[String]>>) -> Self {
        Self {
            labels: labels.into(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Decode every spatial cell into at most one box.
    ///
    /// A cell yields a box when its best class scores strictly above the
    /// threshold, the class has a label, and all four corners lie in `[0, 1]`.
    /// Boxes come back in cell order with distance unset.
    pub fn decode(
        &self,
        tensor: &RawDetectionTensor,
        shape: &ModelShape,
    ) -> Result<Vec<BoundingBox>, DecodeError> {
        if !shape.is_initialized() {
            return Err(DecodeError::UninitializedShape(*shape));
        }
        if tensor.num_channels() != shape.num_channels
            || tensor.num_elements() != shape.num_elements
        {
            return Err(DecodeError::ShapeMismatch {
                expected_channels: shape.num_channels,
                expected_elements: shape.num_elements,
                channels: tensor.num_channels(),
                elements: tensor.num_elements(),
            });
        }

        let mut boxes = Vec::new();
        for cell in 0..shape.num_elements {
            let Some((class_id, confidence)) = self.best_class(tensor, shape, cell) else {
                continue;
            };
            // Model and label list disagree; drop the candidate.
            let Some(class_name) = self.labels.get(class_id) else {
                continue;
            };

            let candidate = BoundingBox::from_center(
                tensor.at(0, cell),
                tensor.at(1, cell),
                tensor.at(2, cell),
                tensor.at(3, cell),
                confidence,
                class_id,
                class_name.as_str(),
            );
            if !corners_in_unit_square(&candidate) {
                continue;
            }
            boxes.push(candidate);
        }
        Ok(boxes)
    }

    /// Argmax over the class rows of one cell, only among scores above the
    /// threshold. Ties keep the lowest class index.
    fn best_class(
        &self,
        tensor: &RawDetectionTensor,
        shape: &ModelShape,
        cell: usize,
    ) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        let mut best_conf = self.confidence_threshold;
        for channel in 4..shape.num_channels {
            let conf = tensor.at(channel, cell);
            if conf > best_conf {
                best_conf = conf;
                best = Some((channel - 4, conf));
            }
        }
        best
    }
}

fn corners_in_unit_square(b: &BoundingBox) -> bool {
    let unit = 0.0..=1.0;
    unit.contains(&b.x1) && unit.contains(&b.y1) && unit.contains(&b.x2) && unit.contains(&b.y2)
}
