//! Marionette server - integration test support.
//!
//! This crate re-exports the workspace crates so that integration tests can
//! assemble the same router the binary serves.

pub use marionette_app as app;
pub use marionette_core as core;
pub use marionette_service as service;
