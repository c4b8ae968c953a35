//! Label allowlist compilation and matching.
//!
//! Decides which event property keys may be promoted to series labels.
//! Entries are `event:key`; either side may be `*`.

use formdash_core::error::{Result, TelemetryError};
use formdash_core::metrics::labels::is_valid_label_name;

/// Label names the tracker sets itself; properties may not shadow them.
const RESERVED_KEYS: [&str; 1] = ["event"];

/// Compiled allowlist rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRule {
    pub event: Option<String>, // None => any event
    pub key: Option<String>,   // None => any key
}

pub fn compile_label_rules(raw: &[String]) -> Result<Vec<LabelRule>> {
    let mut out = Vec::with_capacity(raw.len());
    for s in raw {
        let (event, key) = s.split_once(':').ok_or_else(|| {
            TelemetryError::Configuration(format!(
                "invalid label_allowlist entry: {s} (expected event:key)"
            ))
        })?;
        if event.is_empty() || key.is_empty() {
            return Err(TelemetryError::Configuration(format!(
                "invalid label_allowlist entry: {s} (empty side)"
            )));
        }
        let key = if key == "*" {
            None
        } else {
            if !is_valid_label_name(key) || RESERVED_KEYS.contains(&key) {
                return Err(TelemetryError::Configuration(format!(
                    "invalid label_allowlist key: {key}"
                )));
            }
            Some(key.to_string())
        };
        let event = if event == "*" { None } else { Some(event.to_string()) };
        out.push(LabelRule { event, key });
    }
    Ok(out)
}

/// Wildcard keys still have to be usable label names.
pub fn is_label_allowed(rules: &[LabelRule], event: &str, key: &str) -> bool {
    if !is_valid_label_name(key) || RESERVED_KEYS.contains(&key) {
        return false;
    }
    rules.iter().any(|r| {
        if let Some(e) = &r.event {
            if e != event { return false; }
        }
        match &r.key {
            None => true,
            Some(k) => k == key,
        }
    })
}
