//! Per-session cache of loaded metadata.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use crate::error::{OrmError, Result};
use crate::http::{HttpRequest, Transport};

use super::metadata::Metadata;
use super::resource::ResourceType;

/// One type's entry. `loading` serializes describe calls for that type only.
#[derive(Debug, Default)]
struct Slot {
    metadata: OnceLock<Arc<Metadata>>,
    loading: Mutex<()>,
}

impl Slot {
    fn loaded(metadata: Arc<Metadata>) -> Self {
        let slot = Slot::default();
        let _ = slot.metadata.set(metadata);
        slot
    }
}

/// Loads each type's metadata once and shares it for the session's lifetime.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    slots: RwLock<HashMap<String, Arc<Slot>>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Option<Arc<Slot>> {
        self.slots
            .read()
            .ok()
            .and_then(|slots| slots.get(key).cloned())
    }

    fn slot_or_insert(&self, key: &str) -> Result<Arc<Slot>> {
        if let Some(slot) = self.slot(key) {
            return Ok(slot);
        }
        let mut slots = self
            .slots
            .write()
            .map_err(|e| OrmError::schema(format!("metadata registry poisoned: {}", e)))?;
        Ok(slots.entry(key.to_string()).or_default().clone())
    }

    /// Already-loaded metadata for `name`, without touching the network.
    /// Never waits on a describe call in progress.
    pub fn cached(&self, name: &str) -> Option<Arc<Metadata>> {
        self.slot(&name.to_lowercase())
            .and_then(|slot| slot.metadata.get().cloned())
    }

    /// Seed the registry with a catalog obtained elsewhere.
    pub fn insert(&self, resource: &ResourceType, metadata: Metadata) -> Result<Arc<Metadata>> {
        let metadata = Arc::new(metadata);
        self.slots
            .write()
            .map_err(|e| OrmError::schema(format!("metadata registry poisoned: {}", e)))?
            .insert(
                resource.name().to_lowercase(),
                Arc::new(Slot::loaded(metadata.clone())),
            );
        Ok(metadata)
    }

    /// Cached metadata, or fetch `<path>/describe` exactly once.
    ///
    /// Only callers asking for the same type wait on each other.
    pub fn get_or_load(
        &self,
        transport: &dyn Transport,
        resource: &ResourceType,
    ) -> Result<Arc<Metadata>> {
        let slot = self.slot_or_insert(&resource.name().to_lowercase())?;
        if let Some(metadata) = slot.metadata.get() {
            return Ok(metadata.clone());
        }

        let _guard = slot
            .loading
            .lock()
            .map_err(|e| OrmError::schema(format!("metadata load poisoned: {}", e)))?;

        // Another caller may have loaded it while we waited for the lock.
        if let Some(metadata) = slot.metadata.get() {
            return Ok(metadata.clone());
        }

        tracing::debug!(resource = %resource, "loading metadata");
        let response = transport.send(HttpRequest::get(resource.describe_path()))?;
        if !response.is_success() {
            return Err(OrmError::schema(format!(
                "describe {} returned HTTP {}",
                resource, response.status
            )));
        }

        let source = response
            .json()
            .map_err(|e| OrmError::schema(format!("{} for resource: {}", e, resource)))?
            .ok_or_else(|| OrmError::schema(format!("empty describe for resource: {}", resource)))?;

        let metadata = Arc::new(Metadata::parse(source)?);
        Ok(slot.metadata.get_or_init(|| metadata).clone())
    }

    /// Number of types with loaded metadata.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .map(|slots| slots.values().filter(|s| s.metadata.get().is_some()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
