//! Server config loader (strict parsing).

pub mod schema;

use std::fs;

use formdash_core::error::{Result, TelemetryError};

pub use schema::{AppConfig, AuthzSection, RegistrySection, ServerSection, TelemetrySection};

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| TelemetryError::Configuration(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<AppConfig> {
    let cfg: AppConfig = serde_yaml::from_str(s)
        .map_err(|e| TelemetryError::Configuration(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
