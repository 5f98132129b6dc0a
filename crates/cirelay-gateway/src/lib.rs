//! HTTP surface of the cirelay gateway.
pub mod gateway_server;
pub mod provider_registry;
pub mod rpc_dispatcher;

pub use gateway_server::*;
pub use provider_registry::*;
pub use rpc_dispatcher::*;
