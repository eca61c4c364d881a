#![cfg(feature = "backend-tract")]

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::{DetectionCapability, DetectorBackend};
use crate::detect::result::{ModelShape, RawDetectionTensor};

type Plan = TypedSimplePlan<TypedModel>;

/// Tract-based backend for ONNX detectors.
///
/// Tract runs on the CPU only; GPU requests are accepted and served on CPU.
/// The model is loaded from a local file and the output shape is probed once
/// after optimization.
pub struct TractBackend {
    model_path: PathBuf,
    input_width: u32,
    input_height: u32,
    model: Option<Plan>,
    shape: ModelShape,
}

impl TractBackend {
    /// Load an ONNX model with a `[1, 3, height, width]` float input.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref().to_path_buf();
        let (model, shape) = load_plan(&model_path, width, height)?;
        log::info!(
            "loaded ONNX model {} (input {}x{}, output {}x{})",
            model_path.display(),
            shape.tensor_width,
            shape.tensor_height,
            shape.num_channels,
            shape.num_elements
        );
        Ok(Self {
            model_path,
            input_width: width,
            input_height: height,
            model: Some(model),
            shape,
        })
    }
}

fn load_plan(model_path: &Path, width: u32, height: u32) -> Result<(Plan, ModelShape)> {
    let model = tract_onnx::onnx()
        .model_for_path(model_path)
        .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(
                f32::datum_type(),
                tvec!(1, 3, height as usize, width as usize),
            ),
        )
        .context("failed to set input fact")?
        .into_optimized()
        .context("failed to optimize ONNX model")?;

    let input_shape = concrete_shape(model.input_fact(0)?);
    let output_shape = concrete_shape(model.output_fact(0)?);
    log::debug!("input shape: {:?}", input_shape);
    log::debug!("output shape: {:?}", output_shape);

    let shape = ModelShape::from_tensor_shapes(&input_shape, &output_shape);
    let plan = model
        .into_runnable()
        .context("failed to build runnable ONNX model")?;
    Ok((plan, shape))
}

fn concrete_shape(fact: &TypedFact) -> Vec<usize> {
    fact.shape
        .as_concrete()
        .map(|dims| dims.to_vec())
        .unwrap_or_default()
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(capability, DetectionCapability::ObjectDetection)
    }

    fn shape(&self) -> ModelShape {
        self.shape
    }

    fn detect(&mut self, input: &[f32]) -> Result<RawDetectionTensor> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| anyhow!("tract backend is closed"))?;
        let dims = [
            1,
            3,
            self.shape.tensor_height,
            self.shape.tensor_width,
        ];
        let tensor = Tensor::from_shape(&dims, input).context("input tensor shape mismatch")?;
        let outputs = model
            .run(tvec!(tensor.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        RawDetectionTensor::new(
            view.iter().copied().collect(),
            self.shape.num_channels,
            self.shape.num_elements,
        )
    }

    fn restart(&mut self, use_gpu: bool) -> Result<()> {
        if use_gpu {
            log::warn!("tract has no GPU delegate, falling back to CPU");
        }
        self.model = None;
        let (model, shape) = load_plan(&self.model_path, self.input_width, self.input_height)?;
        self.model = Some(model);
        self.shape = shape;
        log::info!("tract backend restarted from {}", self.model_path.display());
        Ok(())
    }

    fn close(&mut self) {
        self.model = None;
    }
}
