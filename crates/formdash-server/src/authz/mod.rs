//! Authorization-violation detection for data-access errors.
//!
//! Classification is heuristic (error codes and message substrings) and sits
//! behind the `ViolationMatcher` trait so other backends can plug in their own
//! rules. Recording is a pure side effect: wrapped results pass through as-is.

pub mod detector;
pub mod matcher;

pub use detector::{AccessContext, AuthzDetector, DataAccessError, Operation, QueryResult};
pub use matcher::{HeuristicMatcher, ViolationMatcher};

pub const AUTHZ_VIOLATION_TOTAL: &str = "authz_violation_total";
pub const AUTHZ_VIOLATION_HELP: &str = "Row-level authorization policy violations";
