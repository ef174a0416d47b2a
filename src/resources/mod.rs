//! Resource reconcilers.
//!
//! Each run probes the server, compares with the desired state and applies
//! at most one mutating call. In check mode the mutating call and the
//! re-read are skipped and the reported body is a prediction.

pub mod approle;
pub mod auth_method;

use serde::Deserialize;
use serde_json::{Map, Value};
use vault_client::VaultError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Present,
    Absent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Existence {
    Absent,
    Present(Value),
}

impl Existence {
    /// A server "not found" answer means the resource is absent.
    pub fn probe(response: Result<Value, VaultError>) -> Result<Self, VaultError> {
        match response {
            Ok(body) => Ok(Self::Present(body)),
            Err(err) if err.is_not_found() => Ok(Self::Absent),
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoOp,
    Created,
    Updated(Vec<String>),
    Deleted,
}

impl Outcome {
    pub fn changed(&self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

/// `current` with `desired` written over it, recursing into mappings.
pub(crate) fn overlay(current: &Value, desired: &Map<String, Value>) -> Value {
    let mut merged = match current {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    for (key, value) in desired {
        let value = match (merged.get(key), value) {
            (Some(existing @ Value::Object(_)), Value::Object(nested)) => overlay(existing, nested),
            _ => value.clone(),
        };
        merged.insert(key.clone(), value);
    }
    Value::Object(merged)
}

pub(crate) fn as_map(value: &Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
