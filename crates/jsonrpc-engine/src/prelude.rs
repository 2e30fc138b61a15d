//! # JSON-RPC Engine Prelude
//!
//! Re-exports of the types needed to register methods and serve requests.
//!
//! ```rust
//! use jsonrpc_engine::prelude::*;
//! ```

pub use crate::config::ServerConfig;
pub use crate::context::{Connection, RequestContext};
pub use crate::error::{ErrorCode, JsonRpcError, RegistrationError, RpcError};
pub use crate::listener::{EventListener, SelectiveListener};
pub use crate::registry::{Method, Parameter};
pub use crate::request::{JsonRpcRequest, RequestParams};
pub use crate::response::{JsonRpcMessage, JsonRpcResponse};
pub use crate::server::Server;
pub use crate::types::{IntegerId, JsonRpcVersion, RequestId};
pub use crate::validate::Validator;

// Standard error codes
pub use crate::error_codes::*;
