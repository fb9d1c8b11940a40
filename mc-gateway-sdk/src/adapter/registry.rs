use super::{AdapterContext, AdapterFactory, ProtocolAdapter};
use crate::{AdapterError, AdapterResult};
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;

/// Name-keyed factory map populated at startup by the composition root.
///
/// Cloning is cheap and every clone shares the same factories.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    factories: Arc<DashMap<String, Arc<dyn AdapterFactory>>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under its own adapter type name
    pub fn register_factory(&self, factory: Arc<dyn AdapterFactory>) -> AdapterResult<()> {
        let adapter_type = factory.adapter_type().to_string();
        match self.factories.entry(adapter_type.clone()) {
            Entry::Occupied(_) => Err(AdapterError::LoadError(format!(
                "Adapter type '{adapter_type}' already registered"
            ))),
            Entry::Vacant(entry) => {
                entry.insert(factory);
                tracing::info!("Registered adapter factory: type={}", adapter_type);
                Ok(())
            }
        }
    }

    /// Remove a factory; pipelines already built keep their adapter instance
    pub fn unregister(&self, adapter_type: &str) {
        let _ = self.factories.remove(adapter_type);
        tracing::info!("Unregistered adapter factory: type={}", adapter_type);
    }

    #[inline]
    pub fn contains(&self, adapter_type: &str) -> bool {
        self.factories.contains_key(adapter_type)
    }

    /// Registered type names, sorted
    pub fn adapter_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Build an adapter instance for `adapter_type`
    pub fn create(
        &self,
        adapter_type: &str,
        ctx: AdapterContext,
    ) -> AdapterResult<Box<dyn ProtocolAdapter>> {
        // Clone the factory out so no shard guard is held while constructing.
        let factory = self
            .factories
            .get(adapter_type)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| AdapterError::UnknownType(adapter_type.to_string()))?;
        factory.create(ctx)
    }
}
