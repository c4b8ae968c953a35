#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use formdash_core::metrics::render;
use formdash_core::MetricsRegistry;
use formdash_server::config::TelemetrySection;
use formdash_server::telemetry::allowlist::{compile_label_rules, is_label_allowed};
use formdash_server::telemetry::names;
use formdash_server::telemetry::{
    props, Clock, DauStore, MemoryDauStore, SessionRegistry, Tracker, TrackerDeps,
    TrackerSettings,
};

struct FixedClock(Mutex<NaiveDate>);

impl FixedClock {
    fn new(y: i32, m: u32, d: u32) -> Arc<Self> {
        Arc::new(Self(Mutex::new(NaiveDate::from_ymd_opt(y, m, d).unwrap())))
    }

    fn next_day(&self) {
        let mut day = self.0.lock().unwrap();
        *day = day.succ_opt().unwrap();
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.0.lock().unwrap()
    }
}

fn settings(allowlist: &[&str]) -> TrackerSettings {
    let cfg = TelemetrySection {
        label_allowlist: allowlist.iter().map(|s| s.to_string()).collect(),
        ..TelemetrySection::default()
    };
    TrackerSettings::from_config(&cfg).unwrap()
}

fn setup(allowlist: &[&str]) -> (Arc<MetricsRegistry>, Arc<FixedClock>, TrackerDeps) {
    let registry = Arc::new(MetricsRegistry::new());
    let clock = FixedClock::new(2026, 3, 14);
    let deps = TrackerDeps::new(Arc::clone(&registry), settings(allowlist)).with_clock(clock.clone());
    (registry, clock, deps)
}

fn value(reg: &MetricsRegistry, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    reg.snapshot().unwrap().value(name, labels)
}

#[test]
fn page_view_and_feature_counters() {
    let (reg, _, deps) = setup(&[]);
    let t = Tracker::new(deps);
    t.init_session(None);

    t.track_page_view("dashboard", None);
    t.track_page_view("dashboard", Some(&props([("referrer", "email")])));
    t.track_page_view("meals", None);
    t.track_feature_use("ocr_scan", None);

    assert_eq!(value(&reg, names::PAGE_VIEW_TOTAL, &[("page", "dashboard")]), Some(2.0));
    assert_eq!(value(&reg, names::PAGE_VIEW_TOTAL, &[("page", "meals")]), Some(1.0));
    assert_eq!(value(&reg, names::FEATURE_USAGE_TOTAL, &[("feature", "ocr_scan")]), Some(1.0));
}

#[test]
fn init_session_is_idempotent() {
    let (reg, _, deps) = setup(&[]);
    let t = Tracker::new(deps);

    let first = t.init_session(None);
    t.track_page_view("home", None);
    let second = t.init_session(Some("user-1"));

    assert_eq!(first, second);
    assert_eq!(t.user_id().as_deref(), Some("user-1"));
    assert_eq!(value(&reg, names::SESSION_START_TOTAL, &[]), Some(1.0));
    assert_eq!(value(&reg, names::PAGE_VIEW_TOTAL, &[("page", "home")]), Some(1.0));
}

#[test]
fn bind_user_after_session_start() {
    let (_, _, deps) = setup(&[]);
    let t = Tracker::new(deps);
    let sid = t.init_session(None);
    assert_eq!(t.user_id(), None);

    t.bind_user("user-7");
    assert_eq!(t.user_id().as_deref(), Some("user-7"));
    assert_eq!(t.session_id().as_deref(), Some(sid.as_str()));
}

#[test]
fn events_before_init_start_a_session() {
    let (reg, _, deps) = setup(&[]);
    let t = Tracker::new(deps);
    t.track_feature_use("export_csv", None);
    assert!(t.session_id().is_some());
    assert_eq!(value(&reg, names::SESSION_START_TOTAL, &[]), Some(1.0));
}

#[test]
fn dau_counts_once_per_user_per_day() {
    let (reg, clock, deps) = setup(&[]);
    let t = Tracker::new(deps);
    t.init_session(Some("user-1"));

    for _ in 0..5 {
        t.track_dau();
    }
    assert_eq!(value(&reg, names::DAU_TOTAL, &[]), Some(1.0));

    clock.next_day();
    t.track_dau();
    t.track_dau();
    assert_eq!(value(&reg, names::DAU_TOTAL, &[]), Some(2.0));
}

#[test]
fn dau_is_shared_across_sessions_of_one_user() {
    let (reg, _, deps) = setup(&[]);
    let a = Tracker::new(deps.clone());
    let b = Tracker::new(deps);
    a.init_session(Some("user-1"));
    b.init_session(Some("user-1"));
    a.track_dau();
    b.track_dau();
    assert_eq!(value(&reg, names::DAU_TOTAL, &[]), Some(1.0));
}

#[test]
fn dau_without_user_is_noop() {
    let (reg, _, deps) = setup(&[]);
    let t = Tracker::new(deps);
    t.init_session(None);
    t.track_dau();
    assert_eq!(value(&reg, names::DAU_TOTAL, &[]), None);

    t.bind_user("late-user");
    t.track_dau();
    assert_eq!(value(&reg, names::DAU_TOTAL, &[]), Some(1.0));
}

#[test]
fn error_message_never_becomes_a_label() {
    let (reg, _, deps) = setup(&[]);
    let t = Tracker::new(deps);
    let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full at /var/tmp/8734");

    t.track_error("upload_failed", &err, None);
    t.track_error("upload_failed", &err, None);

    assert_eq!(value(&reg, names::ERROR_TOTAL, &[("error", "upload_failed")]), Some(2.0));
    let body = render(&reg.snapshot().unwrap()).unwrap();
    assert!(!body.contains("disk full"));
}

#[test]
fn track_event_promotes_only_allowlisted_keys() {
    let (reg, _, deps) = setup(&["form_submit:form", "*:source"]);
    let t = Tracker::new(deps);

    t.track_event(
        "form_submit",
        Some(&props([("form", "intake"), ("source", "pwa"), ("email", "a@b.c")])),
    );
    t.track_event("meal_logged", Some(&props([("form", "x"), ("source", "web")])));

    assert_eq!(
        value(&reg, names::EVENT_TOTAL, &[("event", "form_submit"), ("form", "intake"), ("source", "pwa")]),
        Some(1.0)
    );
    assert_eq!(
        value(&reg, names::EVENT_TOTAL, &[("event", "meal_logged"), ("source", "web")]),
        Some(1.0)
    );
    let body = render(&reg.snapshot().unwrap()).unwrap();
    assert!(!body.contains("a@b.c"));
}

#[test]
fn non_string_properties_render_as_label_text() {
    let (reg, _, deps) = setup(&["*:*"]);
    let t = Tracker::new(deps);
    t.track_event("quiz", Some(&props([("score", 7_i64)])));
    t.track_event("quiz", Some(&props([("passed", true)])));
    assert_eq!(value(&reg, names::EVENT_TOTAL, &[("event", "quiz"), ("score", "7")]), Some(1.0));
    assert_eq!(value(&reg, names::EVENT_TOTAL, &[("event", "quiz"), ("passed", "true")]), Some(1.0));
}

#[test]
fn long_label_values_are_truncated() {
    let (reg, _, deps) = setup(&[]);
    let t = Tracker::new(deps);
    let page = "p".repeat(500);
    t.track_page_view(&page, None);
    let expected = "p".repeat(128);
    assert_eq!(value(&reg, names::PAGE_VIEW_TOTAL, &[("page", expected.as_str())]), Some(1.0));
}

#[test]
fn failures_are_swallowed() {
    let (reg, _, deps) = setup(&[]);
    reg.gauge(names::PAGE_VIEW_TOTAL, "squatter", 5.0, &[]).unwrap();

    let t = Tracker::new(deps);
    t.track_page_view("home", None);

    assert_eq!(value(&reg, names::PAGE_VIEW_TOTAL, &[]), Some(5.0));
    assert_eq!(value(&reg, names::PAGE_VIEW_TOTAL, &[("page", "home")]), None);
}

#[test]
fn session_registry_resolves_and_evicts() {
    let (reg, _, deps) = setup(&[]);
    let sessions = SessionRegistry::new(deps, 2);
    assert!(sessions.is_empty());

    let a = sessions.get_or_init(None, None);
    let sid_a = a.session_id().unwrap();
    let again = sessions.get_or_init(Some(sid_a.as_str()), Some("user-1"));
    assert!(Arc::ptr_eq(&a, &again));
    assert_eq!(a.user_id().as_deref(), Some("user-1"));

    let unknown = sessions.get_or_init(Some("stale-id"), None);
    assert_ne!(unknown.session_id().as_deref(), Some("stale-id"));
    assert_eq!(sessions.len(), 2);

    let _c = sessions.get_or_init(None, None);
    assert_eq!(sessions.len(), 2);
    assert!(sessions.get(&sid_a).is_none());
    assert_eq!(value(&reg, names::TRACKED_SESSIONS, &[]), Some(2.0));
}

#[test]
fn allowlist_rules() {
    let rules = compile_label_rules(&["form_submit:form".into(), "*:source".into()]).unwrap();
    assert!(is_label_allowed(&rules, "form_submit", "form"));
    assert!(is_label_allowed(&rules, "anything", "source"));
    assert!(!is_label_allowed(&rules, "other", "form"));

    let any = compile_label_rules(&["*:*".into()]).unwrap();
    assert!(is_label_allowed(&any, "e", "k"));
    assert!(!is_label_allowed(&any, "e", "event"));
    assert!(!is_label_allowed(&any, "e", "bad-key"));

    for bad in ["nocolon", ":key", "event:", "e:event", "e:bad-key"] {
        let err = compile_label_rules(&[bad.to_string()]).expect_err(bad);
        assert_eq!(err.class().as_str(), "CONFIGURATION");
    }
}

#[test]
fn properties_over_limit_are_dropped_in_key_order() {
    let registry = Arc::new(MetricsRegistry::new());
    let cfg = TelemetrySection {
        label_allowlist: vec!["*:*".to_string()],
        max_properties: 2,
        ..TelemetrySection::default()
    };
    let deps = TrackerDeps::new(Arc::clone(&registry), TrackerSettings::from_config(&cfg).unwrap());
    let t = Tracker::new(deps);

    t.track_event("form_submit", Some(&props([("c_field", "3"), ("a_field", "1"), ("b_field", "2")])));

    let snap = registry.snapshot().unwrap();
    let fam = snap.family(names::EVENT_TOTAL).unwrap();
    assert_eq!(fam.series.len(), 1);
    assert_eq!(
        fam.series[0].labels.canonical(),
        r#"a_field="1",b_field="2",event="form_submit""#
    );
}

#[test]
fn dau_store_keeps_only_the_newest_day() {
    let store = MemoryDauStore::new();
    assert!(store.is_empty());
    let mut day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

    for _ in 0..30 {
        for u in 0..200 {
            store.mark(&format!("user-{u}"), day);
        }
        day = day.succ_opt().unwrap();
    }

    assert_eq!(store.len(), 200);
    let last = day.pred_opt().unwrap();
    assert_eq!(store.last_seen("user-0"), Some(last));

    // a late mark for an older day prunes nothing
    store.mark("straggler", last.pred_opt().unwrap());
    assert_eq!(store.len(), 201);
    assert_eq!(store.last_seen("user-199"), Some(last));
}

#[test]
fn dau_store_pruning_keeps_dedup_correct() {
    let (reg, clock, deps) = setup(&[]);
    let store = Arc::new(MemoryDauStore::new());
    let deps = deps.with_dau_store(store.clone());
    let a = Tracker::new(deps.clone());
    let b = Tracker::new(deps);
    a.init_session(Some("user-a"));
    b.init_session(Some("user-b"));

    a.track_dau();
    b.track_dau();
    clock.next_day();
    a.track_dau();
    a.track_dau();

    assert_eq!(value(&reg, names::DAU_TOTAL, &[]), Some(3.0));
    assert_eq!(store.len(), 1);
}
