use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{JsonRpcError, RpcError};
use crate::types::{JsonRpcVersion, RequestId};

/// A successful JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    /// Always emitted, `null` included
    pub result: Value,
    pub id: RequestId,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            result,
            id,
        }
    }
}

/// Union type that represents either a successful response or an error response.
/// Keeping the two apart guarantees exactly one of `result`/`error` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Successful response with result field
    Response(JsonRpcResponse),
    /// Error response with error field
    Error(JsonRpcError),
}

impl JsonRpcMessage {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Response(JsonRpcResponse::success(id, result))
    }

    pub fn error(id: Option<RequestId>, error: RpcError) -> Self {
        Self::Error(JsonRpcError::new(id, error))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    /// Get the request ID from either response or error
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcMessage::Response(resp) => Some(&resp.id),
            JsonRpcMessage::Error(err) => err.id.as_ref(),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            JsonRpcMessage::Response(resp) => Some(&resp.result),
            JsonRpcMessage::Error(_) => None,
        }
    }

    pub fn rpc_error(&self) -> Option<&RpcError> {
        match self {
            JsonRpcMessage::Response(_) => None,
            JsonRpcMessage::Error(err) => Some(&err.error),
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for JsonRpcMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_string, to_value};

    #[test]
    fn test_response_serialization() {
        let response = JsonRpcMessage::success(RequestId::from(1), json!("hi"));

        assert_eq!(
            to_value(&response).unwrap(),
            json!({"jsonrpc": "2.0", "result": "hi", "id": 1})
        );
    }

    #[test]
    fn test_null_result_is_emitted() {
        let response = JsonRpcResponse::success(RequestId::from("x"), Value::Null);
        let json_str = to_string(&response).unwrap();
        assert!(json_str.contains("\"result\":null"));
    }

    #[test]
    fn test_message_roundtrip_keeps_variant() {
        let error = JsonRpcMessage::error(Some(RequestId::from(9)), RpcError::method_not_found());
        let parsed: JsonRpcMessage = from_str(&to_string(&error).unwrap()).unwrap();
        assert!(parsed.is_error());
        assert_eq!(parsed.id(), Some(&RequestId::from(9)));
        assert_eq!(parsed.rpc_error().map(|e| e.code), Some(-32601));

        let ok = JsonRpcMessage::success(RequestId::from(2), json!({"a": 1}));
        let parsed: JsonRpcMessage = from_str(&to_string(&ok).unwrap()).unwrap();
        assert!(!parsed.is_error());
        assert_eq!(parsed.result(), Some(&json!({"a": 1})));
    }
}
