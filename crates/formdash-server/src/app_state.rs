//! Shared application state.
//!
//! One registry per process (or per test), passed by reference to the
//! scrape endpoint, the session trackers, and the authz detector.

use std::sync::Arc;

use formdash_core::error::Result;
use formdash_core::metrics::{MetricSource, MetricsRegistry, RegistryLimits};

use crate::authz::{AuthzDetector, HeuristicMatcher};
use crate::config::AppConfig;
use crate::telemetry::{SessionRegistry, TrackerDeps, TrackerSettings};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    source: Arc<dyn MetricSource>,
}

struct AppStateInner {
    registry: Arc<MetricsRegistry>,
    sessions: SessionRegistry,
    authz: AuthzDetector,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: AppConfig) -> Result<Self> {
        let registry = Arc::new(MetricsRegistry::with_limits(RegistryLimits {
            max_series_per_family: cfg.registry.max_series_per_family,
        }));
        let deps = TrackerDeps::new(Arc::clone(&registry), TrackerSettings::from_config(&cfg.telemetry)?);
        Ok(Self::with_deps(&cfg, deps))
    }

    /// Build around caller-provided tracker collaborators (clock, DAU store).
    pub fn with_deps(cfg: &AppConfig, deps: TrackerDeps) -> Self {
        let registry = Arc::clone(&deps.registry);
        let sessions = SessionRegistry::new(deps, cfg.telemetry.max_sessions);
        let authz = AuthzDetector::with_matcher(
            Arc::clone(&registry),
            Arc::new(HeuristicMatcher::from_config(&cfg.authz)),
        );
        let source: Arc<dyn MetricSource> = registry.clone();
        Self {
            inner: Arc::new(AppStateInner { registry, sessions, authz }),
            source,
        }
    }

    /// Serve `/metrics` from another source.
    pub fn with_metric_source(mut self, source: Arc<dyn MetricSource>) -> Self {
        self.source = source;
        self
    }

    pub fn registry(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn metric_source(&self) -> Arc<dyn MetricSource> {
        Arc::clone(&self.source)
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    pub fn authz(&self) -> &AuthzDetector {
        &self.inner.authz
    }
}
