use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::detect::backend::{DetectionCapability, DetectorBackend};
use crate::detect::result::{ModelShape, RawDetectionTensor};

/// Scripted backend for tests and demos.
///
/// Returns queued outputs in order, then repeats the idle output (an
/// all-zero tensor unless one is set). Queued failures surface as inference
/// errors.
pub struct StubBackend {
    shape: ModelShape,
    queued: VecDeque<Result<Vec<f32>, String>>,
    idle: Option<Vec<f32>>,
    gpu_capable: bool,
    gpu_active: bool,
    closed: bool,
    restarts: usize,
    inferences: usize,
}

impl StubBackend {
    pub fn new(shape: ModelShape) -> Self {
        Self {
            shape,
            queued: VecDeque::new(),
            idle: None,
            gpu_capable: false,
            gpu_active: false,
            closed: false,
            restarts: 0,
            inferences: 0,
        }
    }

    /// Advertise GPU acceleration.
    pub fn with_gpu(mut self) -> Self {
        self.gpu_capable = true;
        self
    }

    /// Output returned once the queue is drained.
    pub fn with_idle_output(mut self, data: Vec<f32>) -> Self {
        self.idle = Some(data);
        self
    }

    pub fn push_output(&mut self, data: Vec<f32>) {
        self.queued.push_back(Ok(data));
    }

    pub fn push_failure(&mut self, message: impl Into<String>) {
        self.queued.push_back(Err(message.into()));
    }

    pub fn restarts(&self) -> usize {
        self.restarts
    }

    pub fn inferences(&self) -> usize {
        self.inferences
    }

    fn zero_output(&self) -> Vec<f32> {
        vec![0.0; self.shape.num_channels * self.shape.num_elements]
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        match capability {
            DetectionCapability::ObjectDetection => true,
            DetectionCapability::GpuAccelerable => self.gpu_capable,
        }
    }

    fn shape(&self) -> ModelShape {
        self.shape
    }

    fn detect(&mut self, _input: &[f32]) -> Result<RawDetectionTensor> {
        if self.closed {
            return Err(anyhow!("stub backend is closed"));
        }
        self.inferences += 1;
        let data = match self.queued.pop_front() {
            Some(Ok(data)) => data,
            Some(Err(message)) => return Err(anyhow!(message)),
            None => self.idle.clone().unwrap_or_else(|| self.zero_output()),
        };
        RawDetectionTensor::new(data, self.shape.num_channels, self.shape.num_elements)
    }

    fn restart(&mut self, use_gpu: bool) -> Result<()> {
        self.restarts += 1;
        self.closed = false;
        self.gpu_active = use_gpu && self.gpu_capable;
        if use_gpu && !self.gpu_capable {
            log::warn!("stub backend has no GPU delegate, using CPU");
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn gpu_active(&self) -> bool {
        self.gpu_active
    }
}
