//! # JSON-RPC 2.0 Dispatch Engine
//!
//! A transport-agnostic JSON-RPC 2.0 engine. It takes raw request bytes
//! (a single request or a batch), validates the envelope, binds `params` onto
//! typed async handlers and produces response bytes, or nothing at all for
//! notifications.
//!
//! ## Features
//! - Positional and named parameters, with optional parameters
//! - Handlers are plain async functions; a leading [`RequestContext`] is detected
//! - Batches run on a bounded worker pool
//! - Pluggable argument validation and request lifecycle events
//!
//! ```rust
//! use jsonrpc_engine::prelude::*;
//!
//! async fn add(a: i64, b: i64) -> Result<i64, RpcError> {
//!     Ok(a + b)
//! }
//!
//! # tokio_test_block_on(async {
//! let mut server = Server::with_max_workers(4);
//! server
//!     .register_method(Method::new(
//!         "add",
//!         vec![Parameter::required("a"), Parameter::required("b")],
//!         add,
//!     ))
//!     .unwrap();
//!
//! let reply = server
//!     .handle(&RequestContext::new(), br#"{"jsonrpc":"2.0","method":"add","params":[2,3],"id":1}"#)
//!     .await
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(reply, br#"{"jsonrpc":"2.0","result":5,"id":1}"#);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

pub mod batch;
pub mod binder;
pub mod config;
pub mod context;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod listener;
pub mod registry;
pub mod request;
pub mod response;
pub mod server;
pub mod types;
pub mod validate;

pub mod prelude;

// Re-export main types
pub use config::ServerConfig;
pub use context::{Connection, RequestContext};
pub use dispatch::{DispatchError, Dispatcher};
pub use error::{
    BindError, Error, ErrorCode, JsonRpcError, RegistrationError, Result, RpcError, SanityError,
};
pub use handler::Handler;
pub use listener::{EventListener, SelectiveListener};
pub use registry::{Method, Parameter, Registry};
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcMessage, JsonRpcResponse};
pub use server::Server;
pub use types::{IntegerId, JsonRpcVersion, RequestId};
pub use validate::Validator;

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}
