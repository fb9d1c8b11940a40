use crate::adapter::{VirtualAdapter, VIRTUAL_ADAPTER_TYPE};
use mc_gateway_sdk::{AdapterContext, AdapterFactory, AdapterResult, ProtocolAdapter};

#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualAdapterFactory;

impl AdapterFactory for VirtualAdapterFactory {
    fn adapter_type(&self) -> &str {
        VIRTUAL_ADAPTER_TYPE
    }

    fn create(&self, ctx: AdapterContext) -> AdapterResult<Box<dyn ProtocolAdapter>> {
        Ok(Box::new(VirtualAdapter::new(ctx)?))
    }
}
