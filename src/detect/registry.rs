use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};

use crate::config::DetectorSettings;
use crate::detect::result::PredictionSet;

use super::backend::DetectorBackend;
use super::backends::{FixtureBackend, RemoteBackend, SubprocessBackend};

/// Predictions together with the backend that produced them.
#[derive(Clone, Debug)]
pub struct BackendOutput {
    pub backend: String,
    pub predictions: PredictionSet,
}

/// Thread-safe registry of detector backends; the single place where the
/// backend for a request is chosen.
///
/// Backends are wrapped in `Mutex` because `DetectorBackend::detect` takes `&mut self`.
pub struct BackendRegistry {
    backends: HashMap<String, Arc<Mutex<dyn DetectorBackend>>>,
    default_name: Option<String>,
    fallback_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
            fallback_name: None,
        }
    }

    /// Build a registry from configuration.
    ///
    /// The fixture and remote backends are always registered; the subprocess
    /// backend only when a script is configured.
    pub fn from_settings(settings: &DetectorSettings) -> Result<Self> {
        settings.validate()?;
        let mut registry = Self::new();
        registry.register(FixtureBackend::new());
        registry.register(RemoteBackend::new(settings.remote.clone())?);
        if let Some(sub) = &settings.subprocess {
            registry.register(SubprocessBackend::new(sub.clone()));
        }
        registry.set_default(&settings.backend)?;
        if let Some(fallback) = &settings.fallback {
            registry.set_fallback(fallback)?;
        }
        Ok(registry)
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

    /// Set the backend tried when the default fails.
    pub fn set_fallback(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.fallback_name = Some(name.to_string());
        Ok(())
    }

    pub fn clear_fallback(&mut self) {
        self.fallback_name = None;
    }

    /// Get backend by name.
    pub fn get(&self, name: &str) -> Option<Arc<Mutex<dyn DetectorBackend>>> {
        self.backends.get(name).cloned()
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<Arc<Mutex<dyn DetectorBackend>>> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    pub fn fallback_name(&self) -> Option<&str> {
        self.fallback_name.as_deref()
    }

    /// List registered backends, sorted by name.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Warm up the default and fallback backends.
    pub fn warm_up(&self) -> Result<()> {
        for name in [self.default_name.as_deref(), self.fallback_name.as_deref()]
            .into_iter()
            .flatten()
        {
            self.run_on(name, |backend| backend.warm_up())
                .with_context(|| format!("warm up backend '{}'", name))?;
        }
        Ok(())
    }

    /// Run detection on a named backend.
    pub fn detect_with(&self, name: &str, image: &[u8]) -> Result<BackendOutput> {
        let predictions = self.run_on(name, |backend| backend.detect(image))?;
        Ok(BackendOutput {
            backend: name.to_string(),
            predictions,
        })
    }

    /// Run detection on the default backend, retrying once on the fallback
    /// backend if the default fails.
    pub fn detect(&self, image: &[u8]) -> Result<BackendOutput> {
        let default_name = self
            .default_name
            .as_deref()
            .ok_or_else(|| anyhow!("no detector backend registered"))?;

        match self.detect_with(default_name, image) {
            Ok(output) => Ok(output),
            Err(err) => match self.fallback_name.as_deref() {
                Some(fallback) if fallback != default_name => {
                    log::warn!(
                        "backend '{}' failed ({:#}); falling back to '{}'",
                        default_name,
                        err,
                        fallback
                    );
                    self.detect_with(fallback, image)
                }
                _ => Err(err),
            },
        }
    }

    fn run_on<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut dyn DetectorBackend) -> Result<T>,
    ) -> Result<T> {
        let backend = self
            .get(name)
            .ok_or_else(|| anyhow!("backend '{}' not registered", name))?;
        let mut guard = backend
            .lock()
            .map_err(|_| anyhow!("backend lock poisoned"))?;
        f(&mut *guard)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
