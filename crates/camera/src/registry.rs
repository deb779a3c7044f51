//! CameraRegistry - one SharedCamera per source id
//!
//! Two lookups with the same id share a camera (and therefore one producer
//! thread); different ids never do.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use contracts::SourceId;
use tracing::info;

use crate::camera::SharedCamera;

/// Map of source id to shared camera.
///
/// Read-mostly: lookups of existing cameras take the read lock only.
#[derive(Default)]
pub struct CameraRegistry {
    cameras: RwLock<HashMap<SourceId, Arc<SharedCamera>>>,
}

impl CameraRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    pub fn global() -> &'static CameraRegistry {
        static GLOBAL: OnceLock<CameraRegistry> = OnceLock::new();
        GLOBAL.get_or_init(CameraRegistry::new)
    }

    /// Camera registered under `id`
    pub fn get(&self, id: &str) -> Option<Arc<SharedCamera>> {
        self.cameras
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Camera registered under `id`, created with `init` on first use.
    ///
    /// `init` runs at most once per id, under the write lock.
    pub fn get_or_init<F>(&self, id: &str, init: F) -> Arc<SharedCamera>
    where
        F: FnOnce() -> SharedCamera,
    {
        if let Some(camera) = self.get(id) {
            return camera;
        }

        let mut cameras = self.cameras.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have won the race for the write lock
        if let Some(camera) = cameras.get(id) {
            return Arc::clone(camera);
        }

        let camera = Arc::new(init());
        cameras.insert(SourceId::new(id), Arc::clone(&camera));
        info!(source_id = %id, cameras = cameras.len(), "camera registered");
        camera
    }

    /// Remove the camera of `id`.
    ///
    /// Its producer keeps running for the consumers still holding it and
    /// stops at the next idle timeout.
    pub fn remove(&self, id: &str) -> Option<Arc<SharedCamera>> {
        self.cameras
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// Registered source ids, sorted
    pub fn source_ids(&self) -> Vec<SourceId> {
        let mut ids: Vec<SourceId> = self
            .cameras
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    /// Number of registered cameras
    pub fn len(&self) -> usize {
        self.cameras
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no camera is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CameraRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraRegistry")
            .field("cameras", &self.source_ids())
            .finish()
    }
}
