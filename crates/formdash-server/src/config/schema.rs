use serde::Deserialize;
use formdash_core::error::{Result, TelemetryError};
use formdash_core::metrics::registry::DEFAULT_MAX_SERIES_PER_FAMILY;

use crate::telemetry::allowlist::compile_label_rules;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub registry: RegistrySection,

    #[serde(default)]
    pub telemetry: TelemetrySection,

    #[serde(default)]
    pub authz: AuthzSection,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TelemetryError::UnsupportedVersion);
        }
        self.server.validate()?;
        self.registry.validate()?;
        self.telemetry.validate()?;
        self.authz.validate()?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            registry: RegistrySection::default(),
            telemetry: TelemetrySection::default(),
            authz: AuthzSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { listen: default_listen() }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen.parse::<std::net::SocketAddr>().map_err(|e| {
            TelemetryError::Configuration(format!("server.listen must be a valid SocketAddr: {e}"))
        })?;
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:9464".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySection {
    #[serde(default = "default_max_series_per_family")]
    pub max_series_per_family: usize,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self { max_series_per_family: default_max_series_per_family() }
    }
}

impl RegistrySection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=1_000_000).contains(&self.max_series_per_family) {
            return Err(TelemetryError::Configuration(
                "registry.max_series_per_family must be between 1 and 1000000".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_series_per_family() -> usize {
    DEFAULT_MAX_SERIES_PER_FAMILY
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// `event:key` rules; `*` matches any event or any key.
    #[serde(default)]
    pub label_allowlist: Vec<String>,

    #[serde(default = "default_max_properties")]
    pub max_properties: usize,

    #[serde(default = "default_max_label_value_len")]
    pub max_label_value_len: usize,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            label_allowlist: Vec::new(),
            max_properties: default_max_properties(),
            max_label_value_len: default_max_label_value_len(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl TelemetrySection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=256).contains(&self.max_properties) {
            return Err(TelemetryError::Configuration(
                "telemetry.max_properties must be between 1 and 256".into(),
            ));
        }
        if !(8..=1024).contains(&self.max_label_value_len) {
            return Err(TelemetryError::Configuration(
                "telemetry.max_label_value_len must be between 8 and 1024".into(),
            ));
        }
        if !(1..=1_000_000).contains(&self.max_sessions) {
            return Err(TelemetryError::Configuration(
                "telemetry.max_sessions must be between 1 and 1000000".into(),
            ));
        }
        compile_label_rules(&self.label_allowlist)?;
        Ok(())
    }
}

fn default_max_properties() -> usize {
    32
}
fn default_max_label_value_len() -> usize {
    128
}
fn default_max_sessions() -> usize {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthzSection {
    #[serde(default = "default_authz_codes")]
    pub codes: Vec<String>,

    #[serde(default = "default_authz_substrings")]
    pub substrings: Vec<String>,
}

impl Default for AuthzSection {
    fn default() -> Self {
        Self {
            codes: default_authz_codes(),
            substrings: default_authz_substrings(),
        }
    }
}

impl AuthzSection {
    pub fn validate(&self) -> Result<()> {
        if self.codes.iter().chain(&self.substrings).any(|s| s.trim().is_empty()) {
            return Err(TelemetryError::Configuration(
                "authz.codes and authz.substrings must not contain empty entries".into(),
            ));
        }
        Ok(())
    }
}

/// Postgres `insufficient_privilege` and the PostgREST policy rejection.
pub fn default_authz_codes() -> Vec<String> {
    vec!["42501".into(), "PGRST301".into()]
}

pub fn default_authz_substrings() -> Vec<String> {
    vec!["row-level security".into(), "policy".into(), "permission denied".into()]
}
