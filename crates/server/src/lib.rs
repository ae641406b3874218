//! Body-fat estimator HTTP service
//!
//! The binary in `main.rs` wires configuration, artifact loading and the
//! chat adapter together; the router lives here so integration tests can
//! drive it in-process.

pub mod api;
pub mod config;
