//! E2E integration tests for the icaptest harness.
//!
//! These tests drive the real orchestrator and assertion engine with
//! doubles for the two external seams: a probe that simulates a
//! conforming echo SUT over shared state, and a lifecycle that records
//! transitions instead of spawning processes. No live ICAP server or
//! client binary is needed.
//!
//! # Test Structure
//!
//! - `helpers/` -- Shared doubles, event log, and config builder
//! - `scenarios/` -- Test files organized by concern (matrix ordering,
//!   assertion accounting, conformance scenarios)
//!
//! # Running
//!
//! ```bash
//! cargo test -p icaptest-cli --test e2e
//! ```

mod helpers;
