//! Subcommand handlers.
//!
//! Each module owns one subcommand's execution and its report payloads;
//! all console output flows through [`crate::output::OutputWriter`].

pub mod config;
pub mod probe;
pub mod run;
