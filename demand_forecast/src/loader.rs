//! One-time loading of the serialized model artifact

use crate::error::{ForecastError, Result};
use crate::models::ForecastModel;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Hands out the process-wide, read-only model
pub trait ModelSource: Send + Sync {
    /// The model type provided
    type Model: ForecastModel;

    /// Get the shared model, loading it if needed
    fn load(&self) -> Result<Arc<Self::Model>>;
}

/// Loads a JSON model artifact from a fixed path, at most once
#[derive(Debug)]
pub struct ModelLoader<M> {
    path: PathBuf,
    cached: Mutex<Option<Arc<M>>>,
}

impl<M: DeserializeOwned> ModelLoader<M> {
    /// Create a loader for the artifact at `path`; nothing is read yet
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    /// Path of the artifact
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the artifact has already been loaded
    pub fn is_loaded(&self) -> bool {
        self.cached.lock().is_some()
    }

    /// Get the model, deserializing it on the first successful call.
    ///
    /// Concurrent first callers wait on the same lock, so the artifact is
    /// read once and every caller receives the same handle. A failed load
    /// leaves nothing cached and the next call tries again.
    pub fn load(&self) -> Result<Arc<M>> {
        let mut cached = self.cached.lock();
        if let Some(model) = cached.as_ref() {
            return Ok(Arc::clone(model));
        }

        let model = Arc::new(read_artifact(&self.path)?);
        info!(path = %self.path.display(), "Model loaded successfully");

        *cached = Some(Arc::clone(&model));
        Ok(model)
    }
}

impl<M> ModelSource for ModelLoader<M>
where
    M: ForecastModel + DeserializeOwned,
{
    type Model = M;

    fn load(&self) -> Result<Arc<M>> {
        ModelLoader::load(self)
    }
}

/// A model that is already in memory
#[derive(Debug)]
pub struct InMemoryModel<M>(Arc<M>);

impl<M> InMemoryModel<M> {
    /// Wrap an in-memory model
    pub fn new(model: M) -> Self {
        Self(Arc::new(model))
    }
}

impl<M: ForecastModel> ModelSource for InMemoryModel<M> {
    type Model = M;

    fn load(&self) -> Result<Arc<M>> {
        Ok(Arc::clone(&self.0))
    }
}

fn read_artifact<M: DeserializeOwned>(path: &Path) -> Result<M> {
    if !path.exists() {
        return Err(ForecastError::ArtifactMissing(path.to_path_buf()));
    }

    let corrupt = |reason: String| ForecastError::ArtifactCorrupt {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = fs::read(path).map_err(|e| corrupt(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))
}
