//! Event properties: bounded maps of scalar values.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Bool(b) => write!(f, "{b}"),
            PropValue::Int(i) => write!(f, "{i}"),
            PropValue::Float(x) => write!(f, "{x}"),
            PropValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Str(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Int(v)
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        PropValue::Float(v)
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

pub type Properties = BTreeMap<String, PropValue>;

/// Build a property map from literal pairs.
pub fn props<V: Into<PropValue>>(pairs: impl IntoIterator<Item = (&'static str, V)>) -> Properties {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v.into())).collect()
}

/// Truncate to at most `max` chars, on a char boundary.
pub fn clamp_label_value(v: &str, max: usize) -> String {
    match v.char_indices().nth(max) {
        Some((idx, _)) => v[..idx].to_string(),
        None => v.to_string(),
    }
}
