//! Session tracker: the instrumentation API.
//!
//! Every public call is fire-and-forget. Internal failures (bad label, kind
//! conflict, poisoned lock) are logged here and never reach the caller.

use std::sync::{Arc, Mutex};

use formdash_core::error::Result;
use formdash_core::MetricsRegistry;
use uuid::Uuid;

use crate::config::TelemetrySection;

use super::allowlist::{compile_label_rules, is_label_allowed, LabelRule};
use super::dau::{Clock, DauStore, MemoryDauStore, SystemClock};
use super::event::{clamp_label_value, PropValue, Properties};
use super::names;

/// Tracker tuning compiled from `telemetry` config.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub label_rules: Vec<LabelRule>,
    pub max_properties: usize,
    pub max_label_value_len: usize,
}

impl TrackerSettings {
    pub fn from_config(cfg: &TelemetrySection) -> Result<Self> {
        Ok(Self {
            label_rules: compile_label_rules(&cfg.label_allowlist)?,
            max_properties: cfg.max_properties,
            max_label_value_len: cfg.max_label_value_len,
        })
    }
}

impl Default for TrackerSettings {
    fn default() -> Self {
        let cfg = TelemetrySection::default();
        Self {
            label_rules: Vec::new(),
            max_properties: cfg.max_properties,
            max_label_value_len: cfg.max_label_value_len,
        }
    }
}

/// Shared collaborators every tracker writes through.
#[derive(Clone)]
pub struct TrackerDeps {
    pub registry: Arc<MetricsRegistry>,
    pub dau: Arc<dyn DauStore>,
    pub clock: Arc<dyn Clock>,
    pub settings: Arc<TrackerSettings>,
}

impl TrackerDeps {
    pub fn new(registry: Arc<MetricsRegistry>, settings: TrackerSettings) -> Self {
        Self {
            registry,
            dau: Arc::new(MemoryDauStore::new()),
            clock: Arc::new(SystemClock),
            settings: Arc::new(settings),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_dau_store(mut self, dau: Arc<dyn DauStore>) -> Self {
        self.dau = dau;
        self
    }
}

#[derive(Debug, Clone)]
struct SessionContext {
    session_id: String,
    user_id: Option<String>,
}

pub struct Tracker {
    deps: TrackerDeps,
    session: Mutex<Option<SessionContext>>,
}

impl Tracker {
    pub fn new(deps: TrackerDeps) -> Self {
        Self { deps, session: Mutex::new(None) }
    }

    /// Establish the session context. Idempotent: a second call keeps the
    /// session id and counters, and only binds `user_id` if given.
    pub fn init_session(&self, user_id: Option<&str>) -> String {
        let (session_id, created) = {
            let Ok(mut guard) = self.session.lock() else {
                tracing::warn!("tracker session lock poisoned; init_session skipped");
                return String::new();
            };
            let created = guard.is_none();
            let ctx = guard.get_or_insert_with(|| SessionContext {
                session_id: Uuid::new_v4().to_string(),
                user_id: None,
            });
            if let Some(user) = user_id {
                ctx.user_id = Some(user.to_string());
            }
            (ctx.session_id.clone(), created)
        };

        if created {
            tracing::debug!(session = %session_id, user = ?user_id, "session started");
            self.guard(
                "init_session",
                self.deps.registry.inc(names::SESSION_START_TOTAL, names::SESSION_START_HELP, &[]),
            );
        }
        session_id
    }

    /// Attach an identified user to the current session (starting one if needed).
    pub fn bind_user(&self, user_id: &str) {
        let bound = match self.session.lock() {
            Ok(mut guard) => match guard.as_mut() {
                Some(ctx) => {
                    ctx.user_id = Some(user_id.to_string());
                    true
                }
                None => false,
            },
            Err(_) => {
                tracing::warn!("tracker session lock poisoned; bind_user skipped");
                return;
            }
        };
        if !bound {
            self.init_session(Some(user_id));
        }
    }

    pub fn session_id(&self) -> Option<String> {
        self.context().map(|c| c.session_id)
    }

    pub fn user_id(&self) -> Option<String> {
        self.context().and_then(|c| c.user_id)
    }

    pub fn track_page_view(&self, page: &str, properties: Option<&Properties>) {
        let page = self.clamp(page);
        self.log_event("page_view", &page, properties);
        self.guard(
            "track_page_view",
            self.deps.registry.inc(
                names::PAGE_VIEW_TOTAL,
                names::PAGE_VIEW_HELP,
                &[("page", page.as_str())],
            ),
        );
    }

    pub fn track_feature_use(&self, feature: &str, properties: Option<&Properties>) {
        let feature = self.clamp(feature);
        self.log_event("feature_use", &feature, properties);
        self.guard(
            "track_feature_use",
            self.deps.registry.inc(
                names::FEATURE_USAGE_TOTAL,
                names::FEATURE_USAGE_HELP,
                &[("feature", feature.as_str())],
            ),
        );
    }

    /// The error text goes to the log only; the label is `error_name`.
    pub fn track_error(
        &self,
        error_name: &str,
        error: &dyn std::error::Error,
        properties: Option<&Properties>,
    ) {
        let name = self.clamp(error_name);
        let ctx = self.ensure_session();
        tracing::warn!(
            error_name = %name,
            error = %error,
            session = %ctx.session_id,
            user = ?ctx.user_id,
            properties = ?properties,
            "application error"
        );
        self.guard(
            "track_error",
            self.deps
                .registry
                .inc(names::ERROR_TOTAL, names::ERROR_HELP, &[("error", name.as_str())]),
        );
    }

    /// Count the bound user once per calendar day. No-op without a user.
    pub fn track_dau(&self) {
        let ctx = self.ensure_session();
        let Some(user) = ctx.user_id else {
            tracing::debug!(session = %ctx.session_id, "track_dau without bound user; skipped");
            return;
        };
        let today = self.deps.clock.today();
        if self.deps.dau.last_seen(&user) == Some(today) {
            return;
        }
        let res = self.deps.registry.inc(names::DAU_TOTAL, names::DAU_HELP, &[]);
        if res.is_ok() {
            self.deps.dau.mark(&user, today);
            tracing::debug!(user = %user, day = %today, "daily active user counted");
        }
        self.guard("track_dau", res);
    }

    /// Generic event counter. Only allowlisted property keys become labels.
    pub fn track_event(&self, name: &str, properties: Option<&Properties>) {
        let name = self.clamp(name);
        self.log_event("event", &name, properties);

        let settings = &self.deps.settings;
        let mut labels: Vec<(String, String)> = vec![("event".to_string(), name.clone())];
        let mut dropped: Vec<&str> = Vec::new();
        for (k, v) in self.bounded(properties) {
            if is_label_allowed(&settings.label_rules, &name, k) {
                labels.push((k.to_string(), self.clamp(&v.to_string())));
            } else {
                dropped.push(k);
            }
        }
        if !dropped.is_empty() {
            tracing::debug!(event = %name, dropped = ?dropped, "properties not promoted to labels");
        }

        let labels: Vec<(&str, &str)> = labels.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        self.guard(
            "track_event",
            self.deps.registry.inc(names::EVENT_TOTAL, names::EVENT_HELP, &labels),
        );
    }

    fn context(&self) -> Option<SessionContext> {
        self.session.lock().ok().and_then(|g| g.clone())
    }

    fn ensure_session(&self) -> SessionContext {
        if let Some(ctx) = self.context() {
            return ctx;
        }
        tracing::debug!("event tracked before init_session; starting session");
        let session_id = self.init_session(None);
        self.context().unwrap_or(SessionContext { session_id, user_id: None })
    }

    fn log_event(&self, kind: &str, name: &str, properties: Option<&Properties>) {
        let ctx = self.ensure_session();
        tracing::debug!(
            kind,
            name,
            session = %ctx.session_id,
            user = ?ctx.user_id,
            properties = ?properties,
            "tracked"
        );
    }

    /// First `max_properties` entries in key order.
    fn bounded<'a>(
        &self,
        properties: Option<&'a Properties>,
    ) -> impl Iterator<Item = (&'a str, &'a PropValue)> {
        let max = self.deps.settings.max_properties;
        if let Some(p) = properties {
            if p.len() > max {
                tracing::debug!(count = p.len(), max, "event properties over limit; extra dropped");
            }
        }
        properties
            .into_iter()
            .flat_map(|p| p.iter())
            .take(max)
            .map(|(k, v)| (k.as_str(), v))
    }

    fn clamp(&self, v: &str) -> String {
        clamp_label_value(v, self.deps.settings.max_label_value_len)
    }

    fn guard(&self, op: &str, res: Result<()>) {
        if let Err(e) = res {
            tracing::warn!(op, class = e.class().as_str(), error = %e, "instrumentation failed");
        }
    }
}
