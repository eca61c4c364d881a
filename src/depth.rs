//! Depth frames and per-box distance estimation.
//!
//! Distance is read from the depth sample under a box center. The detector's
//! normalized coordinates are assumed to cover exactly the depth sensor's
//! field of view; no calibration or re-alignment is applied, so the result
//! is an approximation whose accuracy depends on the two sensors agreeing.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::detect::DISTANCE_UNKNOWN;

/// Native resolution of the depth sensor.
pub const DEFAULT_DEPTH_WIDTH: usize = 640;
pub const DEFAULT_DEPTH_HEIGHT: usize = 640;

/// Immutable grid of depth samples in millimeters, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepthFrame {
    width: usize,
    height: usize,
    samples: Vec<u16>,
}

impl DepthFrame {
    pub fn new(width: usize, height: usize, samples: Vec<u16>) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| anyhow!("depth frame dimensions overflow"))?;
        if samples.len() != expected {
            return Err(anyhow!(
                "depth frame length mismatch: expected {}, got {}",
                expected,
                samples.len()
            ));
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// A frame with every sample set to `millimeters`.
    pub fn filled(width: usize, height: usize, millimeters: u16) -> Self {
        Self {
            width,
            height,
            samples: vec![millimeters; width * height],
        }
    }

    /// A frame with no samples. Every lookup reports unknown distance.
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            samples: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples
    }
}

/// Distance in meters under the normalized point `(cx, cy)`.
///
/// Pixel coordinates are truncated toward zero and flattened as
/// `y * width + x`; an index outside the sample buffer, or one that does not
/// fit in `i64`, yields [`DISTANCE_UNKNOWN`].
pub fn estimate_distance(cx: f32, cy: f32, depth: &DepthFrame) -> f32 {
    let pixel_x = (cx * depth.width as f32) as i64;
    let pixel_y = (cy * depth.height as f32) as i64;
    let index = pixel_y
        .checked_mul(depth.width as i64)
        .and_then(|row| row.checked_add(pixel_x))
        .and_then(|index| usize::try_from(index).ok());

    match index.and_then(|index| depth.samples.get(index)) {
        Some(sample) => *sample as f32 / 1000.0,
        None => DISTANCE_UNKNOWN,
    }
}

/// Latest published depth frame, shared between the sensor callback and the
/// frame worker.
///
/// Publishing swaps in a new immutable frame; readers clone the `Arc` and
/// never observe a partially written buffer.
#[derive(Clone, Debug)]
pub struct DepthSnapshot {
    current: Arc<Mutex<Arc<DepthFrame>>>,
}

impl DepthSnapshot {
    pub fn new(initial: DepthFrame) -> Self {
        Self {
            current: Arc::new(Mutex::new(Arc::new(initial))),
        }
    }

    pub fn publish(&self, frame: DepthFrame) -> Result<()> {
        let mut guard = self
            .current
            .lock()
            .map_err(|_| anyhow!("depth snapshot lock poisoned"))?;
        *guard = Arc::new(frame);
        Ok(())
    }

    pub fn latest(&self) -> Result<Arc<DepthFrame>> {
        let guard = self
            .current
            .lock()
            .map_err(|_| anyhow!("depth snapshot lock poisoned"))?;
        Ok(Arc::clone(&guard))
    }
}

impl Default for DepthSnapshot {
    fn default() -> Self {
        Self::new(DepthFrame::empty(DEFAULT_DEPTH_WIDTH, DEFAULT_DEPTH_HEIGHT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millimeters_become_meters() {
        let depth = DepthFrame::filled(640, 640, 2500);
        assert_eq!(estimate_distance(0.5, 0.5, &depth), 2.5);
    }

    #[test]
    fn reads_the_sample_under_the_center() {
        let mut samples = vec![0u16; 16];
        // (x=2, y=1) in a 4x4 frame
        samples[6] = 1200;
        let depth = DepthFrame::new(4, 4, samples).unwrap();
        assert_eq!(estimate_distance(0.6, 0.3, &depth), 1.2);
    }

    #[test]
    fn out_of_bounds_index_is_unknown() {
        let depth = DepthFrame::filled(640, 640, 2500);
        assert_eq!(estimate_distance(0.5, 1.0, &depth), DISTANCE_UNKNOWN);
        assert_eq!(estimate_distance(0.0, -0.1, &depth), DISTANCE_UNKNOWN);
        assert_eq!(estimate_distance(0.5, 0.5, &DepthFrame::empty(640, 640)), -1.0);
    }

    #[test]
    fn extreme_coordinates_are_unknown() {
        let depth = DepthFrame::filled(640, 640, 2500);
        assert_eq!(estimate_distance(0.5, f32::MAX, &depth), DISTANCE_UNKNOWN);
        assert_eq!(estimate_distance(0.5, f32::MIN, &depth), DISTANCE_UNKNOWN);
        assert_eq!(estimate_distance(f32::INFINITY, 0.5, &depth), DISTANCE_UNKNOWN);
        assert_eq!(estimate_distance(f32::MAX, f32::MAX, &depth), DISTANCE_UNKNOWN);
    }

    #[test]
    fn frame_length_is_validated() {
        assert!(DepthFrame::new(4, 4, vec![0; 15]).is_err());
    }

    #[test]
    fn snapshot_readers_keep_their_frame() {
        let snapshot = DepthSnapshot::new(DepthFrame::filled(2, 2, 1000));
        let before = snapshot.latest().unwrap();
        snapshot.publish(DepthFrame::filled(2, 2, 3000)).unwrap();
        assert_eq!(estimate_distance(0.5, 0.5, &before), 1.0);
        assert_eq!(estimate_distance(0.5, 0.5, &snapshot.latest().unwrap()), 3.0);
    }
}
