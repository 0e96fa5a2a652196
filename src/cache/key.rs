//! Canonical cache keys for heterogeneous lookup parameters.
//!
//! Scalars stringify directly. Composite values are serialized to JSON with
//! object keys sorted at every level and reduced to a SHA-256 hex digest, so
//! two bundles with the same content always share a key regardless of field
//! order.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{FrameError, Result};

/// A cache lookup key.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    Int(i64),
    Float(f64),
    Text(String),
    Composite(Value),
}

impl CacheKey {
    /// Build a composite key from any serializable parameter bundle.
    pub fn composite<T: Serialize + ?Sized>(params: &T) -> Result<Self> {
        serde_json::to_value(params)
            .map(CacheKey::Composite)
            .map_err(|e| FrameError::CacheKey {
                message: format!("cannot serialize key parameters: {}", e),
            })
    }

    /// A text key with a namespace prefix, e.g. `frame:100.5`.
    pub fn namespaced(namespace: &str, key: &CacheKey) -> Result<Self> {
        Ok(CacheKey::Text(format!("{}:{}", namespace, key.canonical()?)))
    }

    /// The canonical string form used for storage.
    pub fn canonical(&self) -> Result<String> {
        match self {
            CacheKey::Int(v) => Ok(v.to_string()),
            CacheKey::Float(v) => canonical_float(*v),
            CacheKey::Text(s) => Ok(s.clone()),
            CacheKey::Composite(value) => {
                let json = serde_json::to_string(&sorted(value)).map_err(|e| {
                    FrameError::CacheKey {
                        message: format!("cannot serialize composite key: {}", e),
                    }
                })?;
                Ok(format!("{:x}", Sha256::digest(json.as_bytes())))
            }
        }
    }
}

fn canonical_float(v: f64) -> Result<String> {
    if !v.is_finite() {
        return Err(FrameError::CacheKey {
            message: format!("non-finite number {} cannot be a cache key", v),
        });
    }
    // -0.0 and 0.0 compare equal and must share a key
    let v = if v == 0.0 { 0.0 } else { v };
    Ok(v.to_string())
}

/// Rebuild a JSON value with object keys in sorted order.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::with_capacity(map.len());
            for key in keys {
                out.insert(key.clone(), sorted(&map[key]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

impl From<i64> for CacheKey {
    fn from(v: i64) -> Self {
        CacheKey::Int(v)
    }
}

impl From<u32> for CacheKey {
    fn from(v: u32) -> Self {
        CacheKey::Int(i64::from(v))
    }
}

impl From<f64> for CacheKey {
    fn from(v: f64) -> Self {
        CacheKey::Float(v)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        CacheKey::Text(s.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        CacheKey::Text(s)
    }
}

impl From<Value> for CacheKey {
    fn from(value: Value) -> Self {
        CacheKey::Composite(value)
    }
}
