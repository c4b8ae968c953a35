//! Top-level facade crate for formdash telemetry.
//!
//! Re-exports the core registry/exposition types and the server library so
//! users can depend on a single crate.

pub mod core {
    pub use formdash_core::*;
}

pub mod server {
    pub use formdash_server::*;
}
