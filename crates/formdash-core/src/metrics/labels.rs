//! Label sets and their canonical identity.
//!
//! A label set is flattened into a key-sorted vector; its canonical string
//! (`k1="v1",k2="v2"`) is the series identity inside a family, so call-site
//! ordering never creates a second series.

use std::collections::BTreeMap;

use crate::error::{Result, TelemetryError};

/// Escape a label value for the text exposition format.
pub fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`, minus the reserved `__` prefix.
pub fn is_valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validated, key-sorted label set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Labels {
    pairs: Vec<(String, String)>,
}

impl Labels {
    /// Build from call-site pairs. Duplicate or malformed keys are rejected.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (k, v) in pairs {
            let k = k.into();
            if !is_valid_label_name(&k) {
                return Err(TelemetryError::Validation(format!("invalid label name: {k:?}")));
            }
            if map.insert(k.clone(), v.into()).is_some() {
                return Err(TelemetryError::Validation(format!("duplicate label name: {k}")));
            }
        }
        Ok(Self { pairs: map.into_iter().collect() })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|i| self.pairs[i].1.as_str())
    }

    /// Canonical identity string: sorted keys, escaped values, no braces.
    pub fn canonical(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl<'a> TryFrom<&[(&'a str, &'a str)]> for Labels {
    type Error = TelemetryError;

    fn try_from(pairs: &[(&'a str, &'a str)]) -> Result<Self> {
        Labels::from_pairs(pairs.iter().copied())
    }
}
