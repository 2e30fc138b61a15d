use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::{JsonRpcVersion, RequestId};

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    /// Handler-defined code, carried through unchanged
    Custom(i64),
}

impl ErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            ErrorCode::ParseError => crate::error_codes::PARSE_ERROR,
            ErrorCode::InvalidRequest => crate::error_codes::INVALID_REQUEST,
            ErrorCode::MethodNotFound => crate::error_codes::METHOD_NOT_FOUND,
            ErrorCode::InvalidParams => crate::error_codes::INVALID_PARAMS,
            ErrorCode::InternalError => crate::error_codes::INTERNAL_ERROR,
            ErrorCode::Custom(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::Custom(_) => "Server error",
        }
    }

    /// Map a raw numeric code onto the fixed protocol table.
    pub fn from_code(code: i64) -> Self {
        match code {
            crate::error_codes::PARSE_ERROR => ErrorCode::ParseError,
            crate::error_codes::INVALID_REQUEST => ErrorCode::InvalidRequest,
            crate::error_codes::METHOD_NOT_FOUND => ErrorCode::MethodNotFound,
            crate::error_codes::INVALID_PARAMS => ErrorCode::InvalidParams,
            crate::error_codes::INTERNAL_ERROR => ErrorCode::InternalError,
            other => ErrorCode::Custom(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC Error object.
///
/// This is both the `error` member of a response and the error type every
/// handler returns. Handler errors are never recoded by the engine.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("JSON-RPC error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Build an error with an arbitrary code and message.
    pub fn new(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    /// Build an error from the protocol table. Any code outside the five
    /// reserved ones collapses to Internal Error.
    pub fn from_code(code: i64, data: Option<Value>) -> Self {
        let code = match ErrorCode::from_code(code) {
            ErrorCode::Custom(_) => ErrorCode::InternalError,
            known => known,
        };
        Self::new(code.code(), code.message(), data)
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::from_code(crate::error_codes::PARSE_ERROR, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::from_code(crate::error_codes::INVALID_REQUEST, data)
    }

    pub fn method_not_found() -> Self {
        Self::from_code(crate::error_codes::METHOD_NOT_FOUND, None)
    }

    pub fn invalid_params(data: Option<Value>) -> Self {
        Self::from_code(crate::error_codes::INVALID_PARAMS, data)
    }

    pub fn internal_error(data: Option<Value>) -> Self {
        Self::from_code(crate::error_codes::INTERNAL_ERROR, data)
    }

    /// Attach a `data` member.
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::from_code(self.code)
    }
}

/// JSON-RPC Error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub error: RpcError,
    /// Omitted when the request carried no usable id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl JsonRpcError {
    pub fn new(id: Option<RequestId>, error: RpcError) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            error,
            id,
        }
    }

    pub fn parse_error(detail: impl fmt::Display) -> Self {
        Self::new(None, RpcError::parse_error(Some(detail.to_string().into())))
    }

    pub fn invalid_request(id: Option<RequestId>, detail: impl fmt::Display) -> Self {
        Self::new(id, RpcError::invalid_request(Some(detail.to_string().into())))
    }

    pub fn method_not_found(id: Option<RequestId>) -> Self {
        Self::new(id, RpcError::method_not_found())
    }

    pub fn invalid_params(id: Option<RequestId>, detail: impl fmt::Display) -> Self {
        Self::new(id, RpcError::invalid_params(Some(detail.to_string().into())))
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

/// Envelope sanity-check failures. Each becomes an Invalid Request response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanityError {
    #[error("unsupported RPC request version")]
    UnsupportedVersion,

    #[error("no method specified")]
    MissingMethod,

    #[error("params should be an array or an object")]
    InvalidParams,

    #[error("id should be a string or an integer")]
    InvalidId,
}

impl SanityError {
    /// Whether the request id may be echoed back in the error response.
    pub fn echoes_id(&self) -> bool {
        !matches!(self, SanityError::InvalidId)
    }
}

/// Failures while binding request params onto a handler's arguments.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("missing non-optional param field")]
    MissingParams,

    #[error("missing/unexpected params in list: expected {expected}, got {actual}")]
    ListLength { expected: usize, actual: usize },

    #[error("missing non-optional param: {0}")]
    MissingParam(String),

    #[error("invalid value for param {param}: {source}")]
    Conversion {
        param: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("validation failed for param {param}: {message}")]
    Validation { param: String, message: String },
}

/// Rejections raised while registering a method.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("method name must not be empty")]
    EmptyName,

    #[error(
        "method {method}: number of non-context handler params ({handler}) and declared params ({declared}) must match"
    )]
    ArityMismatch {
        method: String,
        declared: usize,
        handler: usize,
    },

    #[error("method {method}: optional param {param} has no zero value (declare it as Option<T>)")]
    NoZeroValue { method: String, param: String },
}

/// Engine-level errors: the engine could not produce response bytes at all.
/// Protocol errors never appear here; they are encoded into the response.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read request stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("worker pool is closed")]
    WorkerPool(#[from] tokio::sync::AcquireError),
}

pub type Result<T> = std::result::Result<T, Error>;
