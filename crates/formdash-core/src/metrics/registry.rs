//! Process-wide metric registry.
//!
//! Families are keyed by name and series by the canonical label string, both in
//! `BTreeMap`s so snapshots come out already sorted. A single mutex guards the
//! whole structure: every write is O(label-set size), and the snapshot taken for
//! a scrape runs under the same lock, so no series is ever observed mid-update.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, TelemetryError};

use super::labels::{is_valid_metric_name, Labels};

/// Default cap on distinct series per family.
pub const DEFAULT_MAX_SERIES_PER_FAMILY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cumulative histogram state. `bucket_counts[i]` counts observations `<= bounds[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramValue {
    pub bounds: Vec<f64>,
    pub bucket_counts: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

impl HistogramValue {
    fn new(bounds: &[f64]) -> Self {
        Self {
            bounds: bounds.to_vec(),
            bucket_counts: vec![0; bounds.len()],
            sum: 0.0,
            count: 0,
        }
    }

    fn observe(&mut self, v: f64) {
        self.count += 1;
        self.sum += v;
        for (i, &b) in self.bounds.iter().enumerate() {
            if v <= b {
                self.bucket_counts[i] += 1;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValue {
    Counter(f64),
    Gauge(f64),
    Histogram(HistogramValue),
}

impl SeriesValue {
    /// Scalar value for counters and gauges; `None` for histograms.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SeriesValue::Counter(v) | SeriesValue::Gauge(v) => Some(*v),
            SeriesValue::Histogram(_) => None,
        }
    }
}

/// Registry-wide limits.
#[derive(Debug, Clone, Copy)]
pub struct RegistryLimits {
    pub max_series_per_family: usize,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self { max_series_per_family: DEFAULT_MAX_SERIES_PER_FAMILY }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub labels: Labels,
    pub value: SeriesValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FamilySnapshot {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub series: Vec<SeriesSnapshot>,
}

/// Deep copy of the registry. Families sorted by name, series by canonical labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub families: Vec<FamilySnapshot>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn family(&self, name: &str) -> Option<&FamilySnapshot> {
        self.families.iter().find(|f| f.name == name)
    }

    /// Look up one series; label order at the call site does not matter.
    pub fn get(&self, name: &str, labels: &[(&str, &str)]) -> Option<&SeriesValue> {
        let key = Labels::try_from(labels).ok()?;
        self.family(name)?
            .series
            .iter()
            .find(|s| s.labels == key)
            .map(|s| &s.value)
    }

    /// Scalar lookup for counters and gauges.
    pub fn value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.get(name, labels).and_then(SeriesValue::as_f64)
    }
}

/// Anything the scrape endpoint can read a snapshot from.
pub trait MetricSource: Send + Sync {
    fn snapshot(&self) -> Result<Snapshot>;
}

struct Series {
    labels: Labels,
    value: SeriesValue,
}

struct Family {
    help: String,
    kind: MetricKind,
    bounds: Vec<f64>,
    series: BTreeMap<String, Series>,
}

#[derive(Default)]
pub struct MetricsRegistry {
    families: Mutex<BTreeMap<String, Family>>,
    limits: RegistryLimits,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: RegistryLimits) -> Self {
        Self {
            families: Mutex::new(BTreeMap::new()),
            limits: RegistryLimits {
                max_series_per_family: limits.max_series_per_family.max(1),
            },
        }
    }

    /// Add `delta` (>= 0) to the counter series for `labels`.
    pub fn counter(&self, name: &str, help: &str, labels: &[(&str, &str)], delta: f64) -> Result<()> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(TelemetryError::Validation(format!(
                "counter {name}: delta must be a finite non-negative number, got {delta}"
            )));
        }
        self.upsert(name, help, MetricKind::Counter, &[], labels, |v| {
            if let SeriesValue::Counter(c) = v {
                *c += delta;
            }
        })
    }

    /// Increment by 1.
    pub fn inc(&self, name: &str, help: &str, labels: &[(&str, &str)]) -> Result<()> {
        self.counter(name, help, labels, 1.0)
    }

    /// Absolute set of a gauge series.
    pub fn gauge(&self, name: &str, help: &str, value: f64, labels: &[(&str, &str)]) -> Result<()> {
        self.upsert(name, help, MetricKind::Gauge, &[], labels, |v| {
            if let SeriesValue::Gauge(g) = v {
                *g = value;
            }
        })
    }

    /// Signed increment/decrement of a gauge series.
    pub fn gauge_add(&self, name: &str, help: &str, delta: f64, labels: &[(&str, &str)]) -> Result<()> {
        self.upsert(name, help, MetricKind::Gauge, &[], labels, |v| {
            if let SeriesValue::Gauge(g) = v {
                *g += delta;
            }
        })
    }

    /// Record one observation. `bounds` are fixed by the first call for `name`.
    pub fn histogram(
        &self,
        name: &str,
        help: &str,
        bounds: &[f64],
        value: f64,
        labels: &[(&str, &str)],
    ) -> Result<()> {
        if !value.is_finite() {
            return Err(TelemetryError::Validation(format!(
                "histogram {name}: observation must be finite, got {value}"
            )));
        }
        if bounds.is_empty()
            || bounds.iter().any(|b| !b.is_finite())
            || bounds.windows(2).any(|w| w[0] >= w[1])
        {
            return Err(TelemetryError::Validation(format!(
                "histogram {name}: buckets must be non-empty, finite and strictly increasing"
            )));
        }
        if labels.iter().any(|(k, _)| *k == "le") {
            return Err(TelemetryError::Validation(format!(
                "histogram {name}: label name \"le\" is reserved"
            )));
        }
        self.upsert(name, help, MetricKind::Histogram, bounds, labels, |v| {
            if let SeriesValue::Histogram(h) = v {
                h.observe(value);
            }
        })
    }

    /// Deep-copied, sorted view of every family.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let families = self.lock()?;
        let families = families
            .iter()
            .map(|(name, fam)| FamilySnapshot {
                name: name.clone(),
                help: fam.help.clone(),
                kind: fam.kind,
                series: fam
                    .series
                    .values()
                    .map(|s| SeriesSnapshot { labels: s.labels.clone(), value: s.value.clone() })
                    .collect(),
            })
            .collect();
        Ok(Snapshot { families })
    }

    /// Drop every family and series. Test isolation only.
    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Family>>> {
        self.families
            .lock()
            .map_err(|_| TelemetryError::Internal("metrics registry lock poisoned".into()))
    }

    fn upsert(
        &self,
        name: &str,
        help: &str,
        kind: MetricKind,
        bounds: &[f64],
        labels: &[(&str, &str)],
        update: impl FnOnce(&mut SeriesValue),
    ) -> Result<()> {
        if !is_valid_metric_name(name) {
            return Err(TelemetryError::Validation(format!("invalid metric name: {name:?}")));
        }
        let labels = Labels::try_from(labels)?;
        let key = labels.canonical();

        let mut families = self.lock()?;

        if let Some(fam) = families.get(name) {
            if fam.kind != kind {
                return Err(TelemetryError::Configuration(format!(
                    "metric {name} already registered as {}, not {kind}",
                    fam.kind
                )));
            }
            if fam.bounds != bounds {
                return Err(TelemetryError::Configuration(format!(
                    "histogram {name} already registered with different buckets"
                )));
            }
        }

        let fam = families.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!(metric = %name, kind = %kind, "registered metric family");
            Family {
                help: String::new(),
                kind,
                bounds: bounds.to_vec(),
                series: BTreeMap::new(),
            }
        });

        if !fam.series.contains_key(&key) && fam.series.len() >= self.limits.max_series_per_family {
            return Err(TelemetryError::Validation(format!(
                "metric {name}: series limit {} reached",
                self.limits.max_series_per_family
            )));
        }

        // Help text: last write wins.
        if fam.help != help {
            fam.help = help.to_string();
        }

        let series = fam.series.entry(key).or_insert_with(|| Series {
            labels,
            value: match kind {
                MetricKind::Counter => SeriesValue::Counter(0.0),
                MetricKind::Gauge => SeriesValue::Gauge(0.0),
                MetricKind::Histogram => SeriesValue::Histogram(HistogramValue::new(bounds)),
            },
        });
        update(&mut series.value);
        Ok(())
    }
}

impl MetricSource for MetricsRegistry {
    fn snapshot(&self) -> Result<Snapshot> {
        MetricsRegistry::snapshot(self)
    }
}
