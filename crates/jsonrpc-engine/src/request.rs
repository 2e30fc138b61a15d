use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::{RawValue, to_raw_value};
use serde_json::{Map, Value};

use crate::error::SanityError;
use crate::types::RequestId;

/// Parameters for a JSON-RPC request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object
    Object(Map<String, Value>),
}

impl RequestParams {
    /// Get a parameter by name (for object params)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            RequestParams::Object(map) => map.get(key),
            RequestParams::Array(_) => None,
        }
    }

    /// Get a parameter by index (for array params only)
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            RequestParams::Array(vec) => vec.get(index),
            RequestParams::Object(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RequestParams::Object(map) => map.len(),
            RequestParams::Array(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(vec: Vec<Value>) -> Self {
        RequestParams::Array(vec)
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

/// A JSON-RPC request exactly as it was decoded.
///
/// Members are kept loosely typed so that envelope problems surface as
/// Invalid Request (via [`JsonRpcRequest::check`]) instead of Parse error.
/// A missing or `null` member decodes to its empty value; an explicit
/// `"id": null` decodes to `None`, the same as an absent id. The id is kept
/// as raw JSON text so numbers are echoed exactly as written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "jsonrpc", default, deserialize_with = "null_as_empty")]
    pub version: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Box<RawValue>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            version: crate::JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            // a RequestId always encodes
            id: to_raw_value(&id.into()).ok(),
        }
    }

    /// Create a request without an id
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            version: crate::JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: None,
        }
    }

    /// The id in typed form, if it is a valid one.
    pub fn request_id(&self) -> Option<RequestId> {
        self.id.as_deref().and_then(RequestId::from_raw)
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Run the envelope sanity checks: version, method, params shape, id shape.
    pub fn check(&self) -> Result<Call, SanityError> {
        if self.version != crate::JSONRPC_VERSION {
            return Err(SanityError::UnsupportedVersion);
        }
        if self.method.is_empty() {
            return Err(SanityError::MissingMethod);
        }

        let params = match &self.params {
            None => None,
            Some(Value::Array(list)) => Some(RequestParams::Array(list.clone())),
            Some(Value::Object(map)) => Some(RequestParams::Object(map.clone())),
            Some(_) => return Err(SanityError::InvalidParams),
        };

        let id = match &self.id {
            None => None,
            Some(raw) => Some(RequestId::from_raw(raw).ok_or(SanityError::InvalidId)?),
        };

        Ok(Call {
            method: self.method.clone(),
            params,
            id,
        })
    }
}

/// A request that passed every sanity check.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: String,
    pub params: Option<RequestParams>,
    /// `None` marks a notification
    pub id: Option<RequestId>,
}

impl Call {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_string};

    fn raw(value: Value) -> Option<Box<RawValue>> {
        Some(to_raw_value(&value).unwrap())
    }

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::new(1, "test_method", None);

        let json = to_string(&request).unwrap();
        let parsed: JsonRpcRequest = from_str(&json).unwrap();

        assert_eq!(parsed.request_id(), Some(RequestId::from(1)));
        assert_eq!(parsed.method, "test_method");
        assert!(parsed.params.is_none());
    }

    #[test]
    fn test_null_id_is_notification() {
        let parsed: JsonRpcRequest =
            from_str(r#"{"jsonrpc":"2.0","method":"ping","id":null}"#).unwrap();
        assert!(parsed.is_notification());

        let call = parsed.check().unwrap();
        assert!(call.is_notification());
    }

    #[test]
    fn test_missing_members_decode_empty() {
        let parsed: JsonRpcRequest = from_str("{}").unwrap();
        assert_eq!(parsed.version, "");
        assert_eq!(parsed.check(), Err(SanityError::UnsupportedVersion));
    }

    #[test]
    fn test_null_members_decode_empty() {
        let parsed: JsonRpcRequest =
            from_str(r#"{"jsonrpc":"2.0","method":null,"id":5}"#).unwrap();
        assert_eq!(parsed.method, "");
        assert_eq!(parsed.check(), Err(SanityError::MissingMethod));
        assert_eq!(parsed.request_id(), Some(RequestId::from(5)));

        let parsed: JsonRpcRequest =
            from_str(r#"{"jsonrpc":null,"method":"m","id":"a"}"#).unwrap();
        assert_eq!(parsed.check(), Err(SanityError::UnsupportedVersion));
    }

    #[test]
    fn test_integer_ids_beyond_i64() {
        let parsed: JsonRpcRequest =
            from_str(r#"{"jsonrpc":"2.0","method":"m","id":18446744073709551615}"#).unwrap();
        assert_eq!(parsed.check().unwrap().id, Some(RequestId::from(u64::MAX)));

        let parsed: JsonRpcRequest = from_str(r#"{"jsonrpc":"2.0","method":"m","id":1e2}"#).unwrap();
        let id = parsed.check().unwrap().id.unwrap();
        assert_eq!(to_string(&id).unwrap(), "1e2");
    }

    #[test]
    fn test_check_order() {
        let mut request = JsonRpcRequest::new(1, "", Some(json!(5)));
        request.version = "1.0".to_string();
        assert_eq!(request.check(), Err(SanityError::UnsupportedVersion));

        request.version = "2.0".to_string();
        assert_eq!(request.check(), Err(SanityError::MissingMethod));

        request.method = "m".to_string();
        assert_eq!(request.check(), Err(SanityError::InvalidParams));

        request.params = Some(json!([1, 2]));
        request.id = raw(json!(1.5));
        assert_eq!(request.check(), Err(SanityError::InvalidId));
    }

    #[test]
    fn test_params_shapes() {
        let call = JsonRpcRequest::new("a", "m", Some(json!({"x": 1})))
            .check()
            .unwrap();
        let params = call.params.unwrap();
        assert_eq!(params.get("x"), Some(&json!(1)));
        assert_eq!(params.get_index(0), None);

        let call = JsonRpcRequest::new("a", "m", Some(json!(["first", "second"])))
            .check()
            .unwrap();
        let params = call.params.unwrap();
        assert_eq!(params.get_index(1), Some(&json!("second")));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_rejected_id_shapes() {
        for id in [json!(true), json!({"a": 1}), json!([1]), json!(0.5)] {
            let mut request = JsonRpcRequest::notification("m", None);
            request.id = raw(id);
            assert_eq!(request.check(), Err(SanityError::InvalidId));
        }
    }
}
