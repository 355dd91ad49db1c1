//! Shared E2E test helpers.
//!
//! Provides the simulated-SUT probe double, the recording lifecycle
//! double, the unified event log they both append to, and a test
//! environment builder that lays fixtures out in a temp directory.

pub mod doubles;
pub mod env;
