use anyhow::{anyhow, Result};
use serde::Serialize;

/// Distance reported when the depth map has no sample for a box center.
pub const DISTANCE_UNKNOWN: f32 = -1.0;

/// Memory layout of the model's image input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputLayout {
    /// `[1, 3, H, W]`
    #[default]
    Nchw,
    /// `[1, H, W, 3]`
    Nhwc,
}

/// Tensor dimensions discovered from the backend once at model-load time.
///
/// A zeroed shape means the probe failed or the model is not loaded; the
/// decoder refuses to run against it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModelShape {
    pub tensor_width: usize,
    pub tensor_height: usize,
    pub num_channels: usize,
    pub num_elements: usize,
    pub layout: InputLayout,
}

impl ModelShape {
    /// Derive the shape from the backend's input and output tensor shapes.
    ///
    /// Inputs with a channel dimension of 3 in second position are read as
    /// NCHW, everything else as NHWC. Unparseable shapes leave the affected
    /// fields at zero.
    pub fn from_tensor_shapes(input: &[usize], output: &[usize]) -> Self {
        let mut shape = ModelShape::default();

        if input.len() >= 4 && input[1] == 3 {
            shape.layout = InputLayout::Nchw;
            shape.tensor_height = input[2];
            shape.tensor_width = input[3];
        } else if input.len() >= 3 {
            shape.layout = InputLayout::Nhwc;
            shape.tensor_height = input[1];
            shape.tensor_width = input[2];
        }

        if output.len() >= 3 {
            shape.num_channels = output[1];
            shape.num_elements = output[2];
        }
        shape
    }

    /// True when every dimension the decoder indexes with is non-zero.
    pub fn is_initialized(&self) -> bool {
        self.tensor_width != 0
            && self.tensor_height != 0
            && self.num_channels != 0
            && self.num_elements != 0
    }

    /// Number of class-confidence rows (`C - 4`).
    pub fn num_classes(&self) -> usize {
        self.num_channels.saturating_sub(4)
    }
}

/// Raw detector output of shape `[1, C, N]`, row-major.
///
/// Row `0..4` holds `cx, cy, w, h`; rows `4..C` hold per-class confidences.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetectionTensor {
    data: Vec<f32>,
    num_channels: usize,
    num_elements: usize,
}

impl RawDetectionTensor {
    pub fn new(data: Vec<f32>, num_channels: usize, num_elements: usize) -> Result<Self> {
        let expected = num_channels
            .checked_mul(num_elements)
            .ok_or_else(|| anyhow!("detection tensor dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "detection tensor length mismatch: expected {} ({}x{}), got {}",
                expected,
                num_channels,
                num_elements,
                data.len()
            ));
        }
        Ok(Self {
            data,
            num_channels,
            num_elements,
        })
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// Value at `channel` for spatial cell `element`.
    pub fn at(&self, channel: usize, element: usize) -> f32 {
        self.data[channel * self.num_elements + element]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// A detected object in normalized image coordinates.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
    pub confidence: f32,
    pub class_id: usize,
    pub class_name: String,
    /// Meters, or [`DISTANCE_UNKNOWN`].
    pub distance_meters: f32,
}

impl BoundingBox {
    /// Build a box from its center and size. Distance starts unknown.
    pub fn from_center(
        cx: f32,
        cy: f32,
        w: f32,
        h: f32,
        confidence: f32,
        class_id: usize,
        class_name: impl Into<String>,
    ) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
            cx,
            cy,
            w,
            h,
            confidence,
            class_id,
            class_name: class_name.into(),
            distance_meters: DISTANCE_UNKNOWN,
        }
    }

    /// Horizontal center from the corners.
    pub fn center_x(&self) -> f32 {
        (self.x1 + self.x2) / 2.0
    }

    /// Vertical center from the corners.
    pub fn center_y(&self) -> f32 {
        (self.y1 + self.y2) / 2.0
    }

    pub fn has_distance(&self) -> bool {
        self.distance_meters >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nchw_input_shape_is_detected() {
        let shape = ModelShape::from_tensor_shapes(&[1, 3, 480, 640], &[1, 84, 8400]);
        assert_eq!(shape.layout, InputLayout::Nchw);
        assert_eq!(shape.tensor_width, 640);
        assert_eq!(shape.tensor_height, 480);
        assert_eq!(shape.num_channels, 84);
        assert_eq!(shape.num_elements, 8400);
        assert_eq!(shape.num_classes(), 80);
        assert!(shape.is_initialized());
    }

    #[test]
    fn nhwc_input_shape_is_detected() {
        let shape = ModelShape::from_tensor_shapes(&[1, 640, 640, 3], &[1, 6, 100]);
        assert_eq!(shape.layout, InputLayout::Nhwc);
        assert_eq!(shape.tensor_width, 640);
        assert_eq!(shape.tensor_height, 640);
    }

    #[test]
    fn failed_probe_leaves_shape_uninitialized() {
        let shape = ModelShape::from_tensor_shapes(&[1, 3, 640, 640], &[84]);
        assert!(!shape.is_initialized());
        assert!(!ModelShape::default().is_initialized());
    }

    #[test]
    fn tensor_rejects_length_mismatch() {
        assert!(RawDetectionTensor::new(vec![0.0; 10], 5, 3).is_err());
        let tensor = RawDetectionTensor::new((0..15).map(|v| v as f32).collect(), 5, 3).unwrap();
        assert_eq!(tensor.at(1, 2), 5.0);
        assert_eq!(tensor.at(4, 0), 12.0);
    }

    #[test]
    fn box_corners_follow_center_and_size() {
        let b = BoundingBox::from_center(0.5, 0.4, 0.2, 0.4, 0.9, 0, "chair");
        assert!((b.x1 - 0.4).abs() < 1e-6);
        assert!((b.y2 - 0.6).abs() < 1e-6);
        assert!((b.center_x() - 0.5).abs() < 1e-6);
        assert!(!b.has_distance());
    }
}
