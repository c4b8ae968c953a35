//! formdash server library entry.
//!
//! Wires the metrics registry into the scrape endpoint, the instrumentation
//! layer (session trackers), and the authorization-violation detector. Used by
//! the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod authz;
pub mod config;
pub mod ops;
pub mod router;
pub mod telemetry;
