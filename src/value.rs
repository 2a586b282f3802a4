//! Structured values carried by span tags and log metadata.
//!
//! Both end up serialized (JSON for logs and the trace API), so the value
//! model mirrors what JSON can hold instead of an untyped blob.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A tag or metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Map(BTreeMap<String, FieldValue>),
}

/// Ordered key/value map used for log metadata and nested values.
pub type FieldMap = BTreeMap<String, FieldValue>;

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&FieldMap> {
        match self {
            FieldValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<u16> for FieldValue {
    fn from(v: u16) -> Self {
        FieldValue::Int(i64::from(v))
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        i64::try_from(v)
            .map(FieldValue::Int)
            .unwrap_or(FieldValue::Float(v as f64))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<FieldMap> for FieldValue {
    fn from(v: FieldMap) -> Self {
        FieldValue::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_serialization() {
        let mut inner = FieldMap::new();
        inner.insert("code".into(), 500u16.into());
        inner.insert("retry".into(), false.into());

        let value = FieldValue::Map(inner);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"code":500,"retry":false}"#);
    }

    #[test]
    fn test_large_u64_falls_back_to_float() {
        assert_eq!(FieldValue::from(7u64), FieldValue::Int(7));
        assert!(matches!(FieldValue::from(u64::MAX), FieldValue::Float(_)));
    }
}
