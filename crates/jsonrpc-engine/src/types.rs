use std::fmt;

use serde::de;
use serde::ser;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;

/// A uniquely identifying ID for a JSON-RPC request.
/// Can be a string or an integer-valued number, but never null and never
/// written with a decimal point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestId {
    String(String),
    Number(IntegerId),
}

/// An integer-valued id number, kept exactly as it was written.
///
/// `18446744073709551615` and `1e2` are both valid ids and are echoed back
/// byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntegerId(String);

impl IntegerId {
    /// The number as written on the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Serialize for IntegerId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        RawValue::from_string(self.0.clone())
            .map_err(ser::Error::custom)?
            .serialize(serializer)
    }
}

impl RequestId {
    /// Interpret the raw text of a decoded `id` member.
    ///
    /// Returns `None` for values that are not a valid id: numbers containing
    /// a decimal point and every non-string, non-number shape.
    pub fn from_raw(raw: &RawValue) -> Option<Self> {
        let text = raw.get().trim();
        match serde_json::from_str::<Value>(text).ok()? {
            Value::String(s) => Some(RequestId::String(s)),
            Value::Number(_) if !text.contains('.') => {
                Some(RequestId::Number(IntegerId(text.to_string())))
            }
            _ => None,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n.as_str()),
        }
    }
}

impl Serialize for RequestId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            RequestId::String(s) => serializer.serialize_str(s),
            RequestId::Number(n) => n.serialize(serializer),
        }
    }
}

// Used when reading responses back. Numbers arrive already parsed here, so
// only the integer representations are accepted.
impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(RequestId::String(s)),
            Value::Number(n) if !n.is_f64() => Ok(RequestId::Number(IntegerId(n.to_string()))),
            other => Err(de::Error::custom(format!("invalid request id: {other}"))),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(IntegerId(n.to_string()))
    }
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        RequestId::Number(IntegerId(n.to_string()))
    }
}

impl From<i32> for RequestId {
    fn from(n: i32) -> Self {
        RequestId::Number(IntegerId(n.to_string()))
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

/// JSON-RPC version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonRpcVersion {
    #[default]
    V2_0,
}

impl JsonRpcVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonRpcVersion::V2_0 => crate::JSONRPC_VERSION,
        }
    }
}

impl fmt::Display for JsonRpcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            crate::JSONRPC_VERSION => Ok(JsonRpcVersion::V2_0),
            _ => Err(serde::de::Error::custom(format!(
                "Invalid JSON-RPC version: {}",
                s
            ))),
        }
    }
}
