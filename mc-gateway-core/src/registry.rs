use crate::pipeline::GatewayPipeline;
use mc_gateway_error::{MCError, MCResult};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};

/// Running pipelines keyed by gateway id.
///
/// Every operation takes the same lock, held only for the map access.
#[derive(Default)]
pub struct GatewayRegistry {
    pipelines: Mutex<HashMap<String, Arc<GatewayPipeline>>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running pipeline; an id already present is left untouched
    pub fn add(&self, pipeline: Arc<GatewayPipeline>) -> MCResult<()> {
        let mut pipelines = self.pipelines.lock();
        let id = pipeline.gateway_id().to_string();
        if pipelines.contains_key(&id) {
            return Err(MCError::AlreadyRunning(id));
        }
        pipelines.insert(id, pipeline);
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Option<Arc<GatewayPipeline>> {
        self.pipelines.lock().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<GatewayPipeline>> {
        self.pipelines.lock().get(id).cloned()
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.pipelines.lock().contains_key(id)
    }

    /// Sorted ids of every registered pipeline
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.pipelines.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pipelines.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pipelines.lock().is_empty()
    }
}
