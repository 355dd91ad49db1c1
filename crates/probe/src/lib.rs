//! External ICAP probe invocation for the icaptest harness.
//!
//! The harness never speaks ICAP itself: one protocol exchange is one
//! invocation of an external command-line client (`c-icap-client`),
//! and the only observable output is the client's diagnostic trace on
//! stderr. [`CIcapClient`] implements the core
//! [`ProbeInvoker`](icaptest_core::ProbeInvoker) capability; test
//! doubles that return canned traces live with the harness's own tests.

mod client;

pub use client::CIcapClient;
