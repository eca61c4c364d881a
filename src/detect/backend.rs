use anyhow::Result;

use crate::detect::result::{ModelShape, RawDetectionTensor};

/// Optional capabilities a detector backend may offer.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionCapability {
    /// Produces `[1, 4 + classes, cells]` anchor-free output.
    ObjectDetection,
    /// Can run on a GPU delegate.
    GpuAccelerable,
}

/// Inference engine behind the pipeline.
///
/// The backend only turns a preprocessed input tensor into raw detector
/// output. Decoding, suppression and voice state live outside of it, so a
/// backend can be restarted or swapped without touching them.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Returns true when the backend supports a capability.
    fn supports(&self, capability: DetectionCapability) -> bool;

    /// Input/output dimensions probed when the model was loaded.
    fn shape(&self) -> ModelShape;

    /// Run inference on a preprocessed input laid out per [`ModelShape::layout`].
    fn detect(&mut self, input: &[f32]) -> Result<RawDetectionTensor>;

    /// Close and recreate the inference engine.
    ///
    /// Requesting GPU execution on a backend that cannot provide it falls
    /// back to CPU; only a failure to rebuild the engine is an error.
    fn restart(&mut self, use_gpu: bool) -> Result<()>;

    /// Release engine resources. Further `detect` calls may fail.
    fn close(&mut self) {}

    /// True when the engine currently runs on a GPU delegate.
    fn gpu_active(&self) -> bool {
        false
    }
}
