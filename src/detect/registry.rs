use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use super::backend::{DetectionCapability, DetectorBackend};

/// Backend handle shared between the frame worker and administrative calls.
///
/// The mutex serializes `restart` against an in-flight `detect`.
pub type SharedBackend = Arc<Mutex<dyn DetectorBackend>>;

/// Registry of detector backends, selected once at session construction.
pub struct BackendRegistry {
    backends: HashMap<String, SharedBackend>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Get backend by name.
    pub fn get(&self, name: &str) -> Option<SharedBackend> {
        self.backends.get(name).cloned()
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<SharedBackend> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// Select a backend that supports the requested capability.
    ///
    /// Prefers the default backend when it supports the capability.
    pub fn backend_for_capability(&self, capability: DetectionCapability) -> Result<SharedBackend> {
        if let Some(default_backend) = self.default_backend() {
            if supports(&default_backend, capability)? {
                return Ok(default_backend);
            }
        }

        let mut names: Vec<&String> = self.backends.keys().collect();
        names.sort();
        for name in names {
            let backend = &self.backends[name];
            if supports(backend, capability)? {
                return Ok(backend.clone());
            }
        }

        Err(anyhow!(
            "no registered backend supports capability {:?}",
            capability
        ))
    }

    /// Pick the backend for a session and bring it up in the requested mode.
    ///
    /// A GPU request with no GPU-capable backend degrades to the default
    /// backend on CPU. Only a failing engine start is an error.
    pub fn select(&self, use_gpu: bool) -> Result<SharedBackend> {
        let backend = if use_gpu {
            match self.backend_for_capability(DetectionCapability::GpuAccelerable) {
                Ok(backend) => backend,
                Err(_) => {
                    log::warn!("no GPU-capable detector backend registered, using CPU");
                    self.default_backend()
                        .ok_or_else(|| anyhow!("no detector backend registered"))?
                }
            }
        } else {
            self.backend_for_capability(DetectionCapability::ObjectDetection)?
        };

        {
            let mut guard = backend
                .lock()
                .map_err(|_| anyhow!("backend lock poisoned"))?;
            if use_gpu && guard.supports(DetectionCapability::GpuAccelerable) {
                guard.restart(true)?;
            }
            log::info!(
                "selected detector backend '{}' (gpu={})",
                guard.name(),
                guard.gpu_active()
            );
        }
        Ok(backend)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn supports(backend: &SharedBackend, capability: DetectionCapability) -> Result<bool> {
    let guard = backend
        .lock()
        .map_err(|_| anyhow!("backend lock poisoned"))?;
    Ok(guard.supports(capability))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::StubBackend;
    use crate::detect::result::ModelShape;
    use crate::detect::RawDetectionTensor;

    struct NamedCpu;

    impl DetectorBackend for NamedCpu {
        fn name(&self) -> &'static str {
            "cpu"
        }

        fn supports(&self, capability: DetectionCapability) -> bool {
            matches!(capability, DetectionCapability::ObjectDetection)
        }

        fn shape(&self) -> ModelShape {
            ModelShape::default()
        }

        fn detect(&mut self, _input: &[f32]) -> Result<RawDetectionTensor> {
            Err(anyhow!("not loaded"))
        }

        fn restart(&mut self, _use_gpu: bool) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn first_registered_backend_is_default() {
        let mut registry = BackendRegistry::new();
        registry.register(NamedCpu);
        registry.register(StubBackend::new(ModelShape::default()));
        let backend = registry.default_backend().unwrap();
        assert_eq!(backend.lock().unwrap().name(), "cpu");
        assert!(registry.set_default("missing").is_err());
        registry.set_default("stub").unwrap();
        assert_eq!(registry.default_backend().unwrap().lock().unwrap().name(), "stub");
    }

    #[test]
    fn gpu_selection_prefers_capable_backend() {
        let mut registry = BackendRegistry::new();
        registry.register(NamedCpu);
        registry.register(StubBackend::new(ModelShape::default()).with_gpu());
        let backend = registry.select(true).unwrap();
        let guard = backend.lock().unwrap();
        assert_eq!(guard.name(), "stub");
        assert!(guard.gpu_active());
    }

    #[test]
    fn gpu_selection_falls_back_to_default() {
        let mut registry = BackendRegistry::new();
        registry.register(NamedCpu);
        let backend = registry.select(true).unwrap();
        assert_eq!(backend.lock().unwrap().name(), "cpu");
    }

    #[test]
    fn empty_registry_cannot_select() {
        let registry = BackendRegistry::new();
        assert!(registry.select(false).is_err());
        assert!(registry.select(true).is_err());
    }
}
