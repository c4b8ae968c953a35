//! Instrumentation layer: per-session trackers that translate application
//! occurrences (page views, feature use, errors, DAU, generic events) into
//! registry writes.

pub mod allowlist;
pub mod dau;
pub mod event;
pub mod ingest;
pub mod session_registry;
pub mod tracker;

pub use dau::{Clock, DauStore, MemoryDauStore, SystemClock};
pub use event::{props, PropValue, Properties};
pub use session_registry::SessionRegistry;
pub use tracker::{Tracker, TrackerDeps, TrackerSettings};

/// Metric family names written by the tracker.
pub mod names {
    pub const PAGE_VIEW_TOTAL: &str = "page_view_total";
    pub const PAGE_VIEW_HELP: &str = "Page views by page";

    pub const FEATURE_USAGE_TOTAL: &str = "feature_usage_total";
    pub const FEATURE_USAGE_HELP: &str = "Feature usage by feature";

    pub const ERROR_TOTAL: &str = "error_total";
    pub const ERROR_HELP: &str = "Application errors by error name";

    pub const DAU_TOTAL: &str = "daily_active_users_total";
    pub const DAU_HELP: &str = "Distinct users counted once per calendar day";

    pub const EVENT_TOTAL: &str = "event_total";
    pub const EVENT_HELP: &str = "Generic tracked events";

    pub const SESSION_START_TOTAL: &str = "session_start_total";
    pub const SESSION_START_HELP: &str = "Tracking sessions started";

    pub const TRACKED_SESSIONS: &str = "tracked_sessions";
    pub const TRACKED_SESSIONS_HELP: &str = "Sessions currently held by the session registry";
}
