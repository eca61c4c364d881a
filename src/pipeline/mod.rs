//! Per-frame perception pipeline and the detection session around it.
//!
//! One frame flows: preprocess -> backend inference -> decode -> distance ->
//! suppression. Direction classification and voice decisions happen on the
//! speech side (see `session`).

mod inbox;
pub mod session;

use std::time::Instant;

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::config::DetectionSettings;
use crate::depth::{estimate_distance, DepthFrame};
use crate::detect::{apply_nms, BoundingBox, BoxDecoder, ModelShape, SharedBackend};
use crate::ingest::{prepare_input, ImageFrame};

pub use session::{DetectionSession, OverlayUpdate, SessionOutputs};

/// Result of processing one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum FrameOutcome {
    /// Ran to completion and nothing survived suppression.
    Empty,
    /// Surviving boxes in descending confidence order.
    Detected {
        boxes: Vec<BoundingBox>,
        inference_ms: u64,
    },
    /// The frame could not be processed; the pipeline carries on.
    Skipped { reason: String },
}

/// Frame-level orchestration of decode, distance and suppression around a
/// detector backend.
pub struct FramePipeline {
    backend: SharedBackend,
    decoder: BoxDecoder,
    iou_threshold: f32,
    shape: ModelShape,
}

impl FramePipeline {
    /// Bind the pipeline to a backend and cache its model shape.
    pub fn new(
        backend: SharedBackend,
        labels: Vec<String>,
        settings: DetectionSettings,
    ) -> Result<Self> {
        let shape = {
            let guard = backend
                .lock()
                .map_err(|_| anyhow!("backend lock poisoned"))?;
            guard.shape()
        };
        log::info!(
            "model input {}x{} ({:?}), output {}x{}, {} labels",
            shape.tensor_width,
            shape.tensor_height,
            shape.layout,
            shape.num_channels,
            shape.num_elements,
            labels.len()
        );
        if shape.is_initialized() && shape.num_classes() != labels.len() {
            log::warn!(
                "model reports {} classes but {} labels were loaded",
                shape.num_classes(),
                labels.len()
            );
        }

        Ok(Self {
            backend,
            decoder: BoxDecoder::new(labels).with_threshold(settings.confidence_threshold),
            iou_threshold: settings.iou_threshold,
            shape,
        })
    }

    pub fn shape(&self) -> ModelShape {
        self.shape
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    /// Process one frame against one depth snapshot.
    ///
    /// Never fails: configuration and inference errors are logged and
    /// reported as [`FrameOutcome::Skipped`].
    pub fn process(&self, frame: &ImageFrame, depth: &DepthFrame) -> FrameOutcome {
        match self.run(frame, depth) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!("frame skipped: {:#}", err);
                FrameOutcome::Skipped {
                    reason: format!("{:#}", err),
                }
            }
        }
    }

    fn run(&self, frame: &ImageFrame, depth: &DepthFrame) -> Result<FrameOutcome> {
        if !self.shape.is_initialized() {
            return Err(crate::detect::DecodeError::UninitializedShape(self.shape).into());
        }

        let started = Instant::now();
        let input = prepare_input(frame, &self.shape)?;
        let tensor = {
            let mut guard = self
                .backend
                .lock()
                .map_err(|_| anyhow!("backend lock poisoned"))?;
            guard.detect(&input)?
        };

        let mut candidates = self.decoder.decode(&tensor, &self.shape)?;
        for candidate in &mut candidates {
            candidate.distance_meters = estimate_distance(candidate.cx, candidate.cy, depth);
        }
        let boxes = apply_nms(candidates, self.iou_threshold);
        let inference_ms = started.elapsed().as_millis() as u64;

        if boxes.is_empty() {
            log::debug!("no detections ({} ms)", inference_ms);
            return Ok(FrameOutcome::Empty);
        }
        log::debug!("{} detections ({} ms)", boxes.len(), inference_ms);
        Ok(FrameOutcome::Detected {
            boxes,
            inference_ms,
        })
    }
}
