//! In-process metrics: label model, registry, and text exposition.

pub mod exposition;
pub mod labels;
pub mod registry;

pub use exposition::{format_value, render, CONTENT_TYPE};
pub use labels::Labels;
pub use registry::{
    FamilySnapshot, HistogramValue, MetricKind, MetricSource, MetricsRegistry, RegistryLimits,
    SeriesSnapshot, SeriesValue, Snapshot,
};
