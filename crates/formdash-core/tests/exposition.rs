#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use formdash_core::metrics::{format_value, render};
use formdash_core::MetricsRegistry;

#[test]
fn empty_registry_renders_empty_body() {
    let reg = MetricsRegistry::new();
    let body = render(&reg.snapshot().unwrap()).unwrap();
    assert!(body.is_empty());
}

#[test]
fn counter_and_gauge_lines() {
    let reg = MetricsRegistry::new();
    reg.counter("test_counter", "Test counter", &[], 1.0).unwrap();
    reg.gauge("test_gauge", "Test gauge", 10.0, &[]).unwrap();

    let body = render(&reg.snapshot().unwrap()).unwrap();
    let lines: Vec<_> = body.lines().collect();
    assert_eq!(
        lines,
        [
            "# HELP test_counter Test counter",
            "# TYPE test_counter counter",
            "test_counter 1",
            "# HELP test_gauge Test gauge",
            "# TYPE test_gauge gauge",
            "test_gauge 10",
        ]
    );
    assert!(body.ends_with('\n'));
}

#[test]
fn labels_are_sorted_and_escaped() {
    let reg = MetricsRegistry::new();
    reg.inc("page_view_total", "Page views", &[("page", "a\"b\\c\nd"), ("app", "web")])
        .unwrap();
    let body = render(&reg.snapshot().unwrap()).unwrap();
    assert!(body.contains(r#"page_view_total{app="web",page="a\"b\\c\nd"} 1"#), "{body}");
}

#[test]
fn help_text_is_escaped() {
    let reg = MetricsRegistry::new();
    reg.inc("h_total", "line one\nline \\two", &[]).unwrap();
    let body = render(&reg.snapshot().unwrap()).unwrap();
    assert!(body.starts_with("# HELP h_total line one\\nline \\\\two\n"), "{body}");
}

#[test]
fn values_use_shortest_representation() {
    assert_eq!(format_value(1.0), "1");
    assert_eq!(format_value(10.0), "10");
    assert_eq!(format_value(0.1), "0.1");
    assert_eq!(format_value(2.5), "2.5");
    assert_eq!(format_value(-3.0), "-3");
    assert_eq!(format_value(-0.0), "0");
    assert_eq!(format_value(f64::NAN), "NaN");
    assert_eq!(format_value(f64::INFINITY), "+Inf");
    assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
}

#[test]
fn histogram_renders_buckets_sum_and_count() {
    let reg = MetricsRegistry::new();
    reg.histogram("load_seconds", "Page load", &[0.5, 1.0], 0.25, &[("page", "home")]).unwrap();
    reg.histogram("load_seconds", "Page load", &[0.5, 1.0], 2.0, &[("page", "home")]).unwrap();

    let body = render(&reg.snapshot().unwrap()).unwrap();
    let expected = "\
# HELP load_seconds Page load
# TYPE load_seconds histogram
load_seconds_bucket{page=\"home\",le=\"0.5\"} 1
load_seconds_bucket{page=\"home\",le=\"1\"} 1
load_seconds_bucket{page=\"home\",le=\"+Inf\"} 2
load_seconds_sum{page=\"home\"} 2.25
load_seconds_count{page=\"home\"} 2
";
    assert_eq!(body, expected);
}

#[test]
fn unlabelled_histogram_has_bare_sum_and_count() {
    let reg = MetricsRegistry::new();
    reg.histogram("h", "h", &[1.0], 0.5, &[]).unwrap();
    let body = render(&reg.snapshot().unwrap()).unwrap();
    assert!(body.contains("h_bucket{le=\"1\"} 1\n"));
    assert!(body.contains("h_sum 0.5\n"));
    assert!(body.contains("h_count 1\n"));
}
