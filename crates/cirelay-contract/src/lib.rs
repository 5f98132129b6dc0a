//! Wire contract shared by the cirelay gateway and its providers.
//!
//! Holds the JSON-RPC envelope types, the uniform error model, structural
//! request validation, and the handler trait providers implement.

pub mod jsonrpc_envelope;
pub mod resource;
pub mod rpc_error;
pub mod rpc_handler;

pub use jsonrpc_envelope::*;
pub use resource::*;
pub use rpc_error::*;
pub use rpc_handler::*;
