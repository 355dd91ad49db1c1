//! SUT configuration snapshots and process lifecycle control.
//!
//! The service-under-test reads a `config.toml` of its own (service →
//! key → value) and offers no hot-reload path: every configuration
//! change means persist, kill, relaunch, wait-until-ready. This crate
//! owns that dance. [`SutConfigDoc`] round-trips the document without
//! disturbing unrelated keys, [`ConfigSnapshot`] makes restoration a
//! first-class byte-exact operation, and [`SutController`] implements
//! the core [`SutLifecycle`](icaptest_core::SutLifecycle) capability.

mod controller;
mod snapshot;

pub use controller::SutController;
pub use snapshot::{ConfigSnapshot, SutConfigDoc};
