//! Assertion engine: actual-vs-expected comparison and tallying.
//!
//! Every assertion call increments exactly one tally counter and emits
//! one styled result line. Failures are recorded, never raised — the
//! orchestrator always completes the full matrix.

use std::path::Path;

use icaptest_core::digest::files_match;
use icaptest_core::types::{NO_OUTPUT, Outcome, ParsedResponse, Tally, TestCase, Verdict};

use crate::output::Reporter;

/// Accumulates verdicts across a run.
///
/// Threaded explicitly through the orchestrator; the final tally is
/// read once at the end to determine the process outcome.
pub struct AssertionEngine<'r> {
    tally: Tally,
    reporter: &'r Reporter,
}

impl<'r> AssertionEngine<'r> {
    /// Create an engine reporting through `reporter`.
    pub fn new(reporter: &'r Reporter) -> Self {
        Self {
            tally: Tally::new(),
            reporter,
        }
    }

    /// Status-only assertion: exact equality on (code, message).
    pub fn assert_status(&mut self, expected: &TestCase, actual: &ParsedResponse) -> Verdict {
        let passed = actual.status_code == expected.status_code
            && actual.status_message == expected.status_message;
        self.record(
            Verdict::from_bool(passed),
            &format!(
                " --> result: {actual}; expected: {} {}",
                expected.status_code, expected.status_message
            ),
        )
    }

    /// Header assertion: the full "code message" line must equal
    /// `expected` (204-shortcut sweeps, where no body is transmitted).
    pub fn assert_header(&mut self, file_name: &str, expected: &str, actual: &ParsedResponse) -> Verdict {
        let passed = actual.to_string() == expected;
        self.record(
            Verdict::from_bool(passed),
            &format!(" --> file: {file_name} result header: {actual}; expected: {expected}"),
        )
    }

    /// Content + status assertion.
    ///
    /// The observed outcome is `OK` when the captured file's digest
    /// equals the golden file's (a missing capture is "not matched",
    /// not an error). The case passes when that outcome equals the
    /// manifest's expectation **and** the status is exactly `200 OK` —
    /// a rejected exchange still answers `200 OK` on the ICAP layer.
    pub fn assert_content(
        &mut self,
        file_name: &str,
        expected: Outcome,
        actual: &ParsedResponse,
        golden: &Path,
        captured: &Path,
    ) -> Verdict {
        let observed = if files_match(golden, captured) {
            Outcome::Ok
        } else {
            Outcome::Failed
        };
        let received = match observed {
            Outcome::Ok => "file received",
            Outcome::Failed => "file not received",
        };
        let passed = observed == expected && actual.is_ok_200();
        self.record(
            Verdict::from_bool(passed),
            &format!(
                " --> file: {file_name} result: {received} and status {actual}; expected: {expected}"
            ),
        )
    }

    /// Cache-tag assertion: the trace's ISTag must equal the tag the
    /// SUT config advertises for the service.
    pub fn assert_tag(&mut self, service: &str, expected: &str, actual: Option<&str>) -> Verdict {
        let actual = actual.unwrap_or(NO_OUTPUT);
        let passed = actual == expected;
        self.record(
            Verdict::from_bool(passed),
            &format!(" --> service: {service} tag: {actual}; expected: {expected}"),
        )
    }

    /// The accumulated tally so far.
    pub fn tally(&self) -> Tally {
        self.tally
    }

    fn record(&mut self, verdict: Verdict, detail: &str) -> Verdict {
        self.tally.record(verdict);
        match verdict {
            Verdict::Pass => self.reporter.pass(detail),
            Verdict::Fail => self.reporter.fail(detail),
        }
        verdict
    }
}
