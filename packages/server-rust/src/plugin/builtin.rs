//! Backends compiled into the gateway, selectable as `builtin:<name>`.

use std::sync::Arc;

use dbzmq_core::Backend;

use crate::backends::{BackendConfig, KvBackend, MemoryEngine, NullBackend};
use crate::error::GatewayError;

/// Constructor for one built-in backend.
pub type BackendFactory = fn(&BackendConfig) -> anyhow::Result<Arc<dyn Backend>>;

/// Name-to-constructor table of built-in backends.
///
/// Holds factories rather than instances: nothing is opened until a backend
/// is selected.
pub struct BuiltinRegistry {
    factories: Vec<(&'static str, BackendFactory)>,
}

impl BuiltinRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Registry with every backend compiled into this build.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("null", null);
        registry.register("memory", memory);
        #[cfg(feature = "redb")]
        registry.register("redb", redb);
        registry
    }

    /// Adds or replaces the factory for `name`.
    pub fn register(&mut self, name: &'static str, factory: BackendFactory) {
        match self.factories.iter_mut().find(|(known, _)| *known == name) {
            Some(entry) => entry.1 = factory,
            None => self.factories.push((name, factory)),
        }
    }

    /// Registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.iter().map(|(name, _)| *name).collect()
    }

    /// Instantiates the backend registered as `name`.
    ///
    /// # Errors
    ///
    /// [`GatewayError::UnknownBuiltin`] if no backend has that name,
    /// [`GatewayError::BackendInit`] if its constructor fails.
    pub fn create(
        &self,
        name: &str,
        config: &BackendConfig,
    ) -> Result<Arc<dyn Backend>, GatewayError> {
        let (_, factory) = self
            .factories
            .iter()
            .find(|(known, _)| *known == name)
            .ok_or_else(|| GatewayError::UnknownBuiltin {
                name: name.to_string(),
                available: self.names().join(", "),
            })?;
        factory(config).map_err(|source| GatewayError::BackendInit {
            name: name.to_string(),
            source,
        })
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn null(_config: &BackendConfig) -> anyhow::Result<Arc<dyn Backend>> {
    Ok(Arc::new(NullBackend))
}

fn memory(config: &BackendConfig) -> anyhow::Result<Arc<dyn Backend>> {
    Ok(Arc::new(KvBackend::new(
        "memory",
        MemoryEngine::new(),
        config.framing,
    )))
}

#[cfg(feature = "redb")]
fn redb(config: &BackendConfig) -> anyhow::Result<Arc<dyn Backend>> {
    let engine = crate::backends::RedbEngine::open(&config.redb_file)?;
    Ok(Arc::new(KvBackend::new("redb", engine, config.framing)))
}
