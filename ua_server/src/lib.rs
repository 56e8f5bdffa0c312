//! HTTP surface of the user authentication service.
//!
//! The binary in `main.rs` wires configuration, stores and the router; this
//! library exposes the same pieces so integration tests can drive the router
//! directly.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
