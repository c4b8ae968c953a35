//! Prometheus text exposition (format 0.0.4).
//!
//! Families are emitted in name order with `# HELP` / `# TYPE` headers, series
//! in canonical label order. An empty snapshot renders to an empty body.

use std::fmt::Write;

use crate::error::Result;

use super::labels::escape_label;
use super::registry::{HistogramValue, SeriesValue, Snapshot};

/// Content type served alongside the rendered text.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Shortest round-trip decimal; integral values carry no decimal point.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        let s = if v > 0.0 { "+Inf" } else { "-Inf" };
        s.to_string()
    } else if v == 0.0 {
        // Also folds -0.
        "0".to_string()
    } else {
        format!("{v}")
    }
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn write_sample(out: &mut String, name: &str, labels: &str, value: &str) -> Result<()> {
    if labels.is_empty() {
        writeln!(out, "{name} {value}")?;
    } else {
        writeln!(out, "{name}{{{labels}}} {value}")?;
    }
    Ok(())
}

fn write_histogram(out: &mut String, name: &str, labels: &str, h: &HistogramValue) -> Result<()> {
    let prefix = if labels.is_empty() { String::new() } else { format!("{labels},") };
    let bucket = format!("{name}_bucket");

    for (le, count) in h.bounds.iter().zip(&h.bucket_counts) {
        let le = escape_label(&format_value(*le));
        write_sample(out, &bucket, &format!("{prefix}le=\"{le}\""), &count.to_string())?;
    }
    write_sample(out, &bucket, &format!("{prefix}le=\"+Inf\""), &h.count.to_string())?;
    write_sample(out, &format!("{name}_sum"), labels, &format_value(h.sum))?;
    write_sample(out, &format!("{name}_count"), labels, &h.count.to_string())?;
    Ok(())
}

/// Render a snapshot to exposition text.
pub fn render(snapshot: &Snapshot) -> Result<String> {
    let mut out = String::new();
    for fam in &snapshot.families {
        writeln!(out, "# HELP {} {}", fam.name, escape_help(&fam.help))?;
        writeln!(out, "# TYPE {} {}", fam.name, fam.kind)?;
        for s in &fam.series {
            let labels = s.labels.canonical();
            match &s.value {
                SeriesValue::Counter(v) | SeriesValue::Gauge(v) => {
                    write_sample(&mut out, &fam.name, &labels, &format_value(*v))?
                }
                SeriesValue::Histogram(h) => write_histogram(&mut out, &fam.name, &labels, h)?,
            }
        }
    }
    Ok(out)
}
