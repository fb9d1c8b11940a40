// Loopback protocol adapter registered under the `virtual` type.
//
// Used by the controller binary out of the box and by demos that need a
// working gateway without any device network attached.

mod adapter;
mod factory;
mod types;

pub use adapter::{VirtualAdapter, VIRTUAL_ADAPTER_TYPE};
pub use factory::VirtualAdapterFactory;
pub use types::VirtualConfig;
