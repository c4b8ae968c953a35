//! formdash core: the in-process metrics registry, its label/series model, and
//! the text exposition serializer.
//!
//! This crate carries no transport or runtime dependencies; the server crate
//! wires it into HTTP handlers and the instrumentation layer.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here.
//! All fallible paths surface as `TelemetryError`/`Result`, so a bad metric
//! name or a poisoned lock never takes the host process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metrics;

/// Shared result type.
pub use error::{ErrorClass, Result, TelemetryError};
pub use metrics::{
    render, Labels, MetricKind, MetricSource, MetricsRegistry, RegistryLimits, SeriesValue,
    Snapshot,
};
