//! Scenario orchestration: matrix enumeration and lifecycle sequencing.
//!
//! The orchestrator walks the conformance matrix strictly sequentially
//! — one probe issued, awaited and parsed before the next, fixture
//! order preserved, never randomized or parallelized. Config-sensitive
//! blocks are bracketed by exactly one `reconfigure` before and one
//! `restore` after; an assertion made against the wrong configuration
//! epoch would be a silently wrong result, not a caught error, so this
//! ordering is the harness's core correctness property.
//!
//! Assertion failures never stop the run. Only configuration mutation
//! and SUT lifecycle failures abort — and even then teardown drains
//! every outstanding restore before handing the error up.

use tracing::{info, warn};

use icaptest_core::config::HarnessConfig;
use icaptest_core::error::HarnessError;
use icaptest_core::sut::{
    AdaptationMode, PreviewPolicy, ProbeInvoker, ProbeRequest, SutLifecycle,
};
use icaptest_core::trace::{parse_istag, parse_status};
use icaptest_core::types::{Outcome, ParsedResponse, SizeTestCase, TestCase};

use crate::assert::AssertionEngine;
use crate::output::Reporter;

/// HTTP methods swept per mode. The last token is deliberately not a
/// real method: content adaptation must be transport-method agnostic.
pub const HTTP_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "TRACE", "FackeMehod",
];

/// The adaptation service exercised by file and method sweeps.
const ECHO_SERVICE: &str = "echo";

/// Everything a run consumes besides configuration: fixture rows and
/// the tag catalog read from the SUT's own config.
pub struct RunInputs {
    /// Service-name cases, in fixture order.
    pub service_cases: Vec<TestCase>,
    /// File sweep cases, in fixture order.
    pub size_cases: Vec<SizeTestCase>,
    /// (service, expected ISTag) pairs; empty when tag checks are
    /// skipped.
    pub tag_catalog: Vec<(String, String)>,
}

/// How a content sweep derives each case's expected outcome.
#[derive(Clone, Copy)]
enum Expectation {
    /// Every case expects the same outcome.
    Fixed(Outcome),
    /// Each case expects its manifest token (size-limit block).
    FromManifest,
}

/// Drives the full conformance matrix against one SUT.
pub struct Orchestrator<'a> {
    config: &'a HarnessConfig,
    lifecycle: &'a mut dyn SutLifecycle,
    probe: &'a dyn ProbeInvoker,
    reporter: &'a Reporter,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a HarnessConfig,
        lifecycle: &'a mut dyn SutLifecycle,
        probe: &'a dyn ProbeInvoker,
        reporter: &'a Reporter,
    ) -> Self {
        Self {
            config,
            lifecycle,
            probe,
            reporter,
        }
    }

    /// Run the matrix, recording verdicts into `engine`.
    ///
    /// Teardown (restore drain + shutdown) runs whether the matrix
    /// completed or aborted; the first error wins.
    pub async fn run(
        &mut self,
        inputs: &RunInputs,
        modes: &[AdaptationMode],
        engine: &mut AssertionEngine<'_>,
    ) -> Result<(), HarnessError> {
        let result = match self.setup().await {
            Ok(()) => self.run_matrix(inputs, modes, engine).await,
            Err(e) => Err(e),
        };
        result.and(self.teardown().await)
    }

    /// Start the SUT and prime extension routing so every sweep file
    /// is processed rather than bypassed by its extension.
    async fn setup(&mut self) -> Result<(), HarnessError> {
        self.lifecycle.start().await?;
        self.lifecycle
            .reconfigure(
                ECHO_SERVICE,
                "bypass_extensions",
                toml::Value::Array(vec![toml::Value::String("pdf".to_owned())]),
            )
            .await?;
        self.lifecycle
            .reconfigure(
                ECHO_SERVICE,
                "process_extensions",
                toml::Value::Array(vec![toml::Value::String("*".to_owned())]),
            )
            .await?;
        Ok(())
    }

    /// Restore every outstanding configuration epoch, then shut the
    /// SUT down. Runs on success and on abort alike.
    async fn teardown(&mut self) -> Result<(), HarnessError> {
        let mut first_err = None;
        while self.lifecycle.pending_restores() > 0 {
            if let Err(e) = self.lifecycle.restore().await {
                warn!(error = %e, "config restore during teardown failed");
                first_err = Some(e);
                break;
            }
        }
        if let Err(e) = self.lifecycle.shutdown().await {
            warn!(error = %e, "SUT shutdown failed");
            first_err.get_or_insert(e);
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn run_matrix(
        &mut self,
        inputs: &RunInputs,
        modes: &[AdaptationMode],
        engine: &mut AssertionEngine<'_>,
    ) -> Result<(), HarnessError> {
        self.service_name_sweeps(&inputs.service_cases, engine)
            .await?;
        for mode in modes {
            self.mode_block(mode, &inputs.size_cases, engine).await?;
        }
        if !inputs.tag_catalog.is_empty() {
            self.tag_sweeps(inputs, engine).await?;
        }
        Ok(())
    }

    /// Status-only sweeps over the service-name fixture, with and
    /// without the 204 negotiation shortcut.
    async fn service_name_sweeps(
        &mut self,
        cases: &[TestCase],
        engine: &mut AssertionEngine<'_>,
    ) -> Result<(), HarnessError> {
        let input = self.config.fixtures.service_probe_path();
        let output = self.config.fixtures.output_path();

        self.reporter.block("Test wrong service name with 204");
        for case in cases {
            let req = ProbeRequest::new(&case.service, &input, &output);
            let resp = self.probe_status(&req).await?;
            engine.assert_status(case, &resp);
        }

        self.reporter.block("Test wrong service name without 204");
        for case in cases {
            let req = ProbeRequest::new(&case.service, &input, &output).no_204();
            let resp = self.probe_status(&req).await?;
            engine.assert_status(case, &resp);
        }
        Ok(())
    }

    /// The full per-mode block: negotiation, config-sensitive sweeps,
    /// client preview variants, HTTP methods.
    async fn mode_block(
        &mut self,
        mode: &AdaptationMode,
        cases: &[SizeTestCase],
        engine: &mut AssertionEngine<'_>,
    ) -> Result<(), HarnessError> {
        let name = mode_title(mode);
        info!(mode = %mode, "starting mode block");

        // Negotiation shortcut on: no body comes back, only the header
        // line is checked.
        self.reporter
            .block(&format!("Test {name} mode echo service with 204"));
        for case in cases {
            let input = self.config.fixtures.input_path(&case.file_name);
            let output = self.config.fixtures.output_path();
            let req = ProbeRequest::new(ECHO_SERVICE, &input, &output).mode(mode.clone());
            let resp = self.probe_status(&req).await?;
            engine.assert_header(&case.file_name, "200 OK", &resp);
        }

        self.reporter
            .block(&format!("Test {name} mode echo service without 204"));
        self.content_sweep(
            mode,
            cases,
            Expectation::Fixed(Outcome::Ok),
            PreviewPolicy::ClientDefault,
            None,
            engine,
        )
        .await?;

        // Config-sensitive: maximum accepted file size. Expected
        // outcomes come from the manifest, which assumes this limit.
        self.reporter
            .block(&format!("Test {name} mode echo service with max file size"));
        self.lifecycle
            .reconfigure(
                ECHO_SERVICE,
                "max_filesize",
                toml::Value::Integer(self.config.fixtures.size_limit_bytes),
            )
            .await?;
        let sweep = self
            .content_sweep(
                mode,
                cases,
                Expectation::FromManifest,
                PreviewPolicy::ClientDefault,
                None,
                engine,
            )
            .await;
        let restored = self.lifecycle.restore().await;
        sweep?;
        restored?;

        // Config-sensitive: preview disabled server-side.
        self.reporter.block(&format!(
            "Test {name} mode echo service without preview (server side)"
        ));
        self.lifecycle
            .reconfigure(ECHO_SERVICE, "preview_enabled", toml::Value::Boolean(false))
            .await?;
        let sweep = self
            .content_sweep(
                mode,
                cases,
                Expectation::Fixed(Outcome::Ok),
                PreviewPolicy::ClientDefault,
                None,
                engine,
            )
            .await;
        let restored = self.lifecycle.restore().await;
        sweep?;
        restored?;

        // Client-side preview variants need no SUT configuration.
        self.reporter.block(&format!(
            "Test {name} mode echo service without preview (client side)"
        ));
        self.content_sweep(
            mode,
            cases,
            Expectation::Fixed(Outcome::Ok),
            PreviewPolicy::Disabled,
            None,
            engine,
        )
        .await?;

        self.reporter.block(&format!(
            "Test {name} mode echo service with preview 0 (client side)"
        ));
        self.content_sweep(
            mode,
            cases,
            Expectation::Fixed(Outcome::Ok),
            PreviewPolicy::Window(0),
            None,
            engine,
        )
        .await?;

        // An over-length preview window is not a protocol violation.
        self.reporter.block(&format!(
            "Test {name} mode echo service with preview exceeding limit"
        ));
        self.content_sweep(
            mode,
            cases,
            Expectation::Fixed(Outcome::Ok),
            PreviewPolicy::Window(self.config.probe.over_limit_preview),
            None,
            engine,
        )
        .await?;

        self.reporter.block(&format!(
            "Test {name} mode echo service with preview crossing file size"
        ));
        self.content_sweep(
            mode,
            cases,
            Expectation::Fixed(Outcome::Ok),
            PreviewPolicy::Window(self.config.probe.mid_file_preview),
            None,
            engine,
        )
        .await?;

        self.reporter
            .block(&format!("Test {name} mode echo service with HTTP methods"));
        for method in HTTP_METHODS.iter().copied() {
            self.reporter.sub(&format!("Method: {method}"));
            self.content_sweep(
                mode,
                cases,
                Expectation::Fixed(Outcome::Ok),
                PreviewPolicy::Window(self.config.probe.mid_file_preview),
                Some(method),
                engine,
            )
            .await?;
        }

        Ok(())
    }

    /// One content+status sweep over the size manifest, in order.
    async fn content_sweep(
        &self,
        mode: &AdaptationMode,
        cases: &[SizeTestCase],
        expectation: Expectation,
        preview: PreviewPolicy,
        method: Option<&str>,
        engine: &mut AssertionEngine<'_>,
    ) -> Result<(), HarnessError> {
        for case in cases {
            let input = self.config.fixtures.input_path(&case.file_name);
            let output = self.config.fixtures.output_path();
            let mut req = ProbeRequest::new(ECHO_SERVICE, &input, &output)
                .mode(mode.clone())
                .no_204()
                .preview(preview);
            if let Some(method) = method {
                req = req.method(method);
            }
            let resp = self.probe_status(&req).await?;
            let expected = match expectation {
                Expectation::Fixed(outcome) => outcome,
                Expectation::FromManifest => case.expected,
            };
            engine.assert_content(&case.file_name, expected, &resp, &input, &output);
        }
        Ok(())
    }

    /// Cache-tag sweeps: every configured service's ISTag, with 204,
    /// without, and with a zero preview window.
    async fn tag_sweeps(
        &mut self,
        inputs: &RunInputs,
        engine: &mut AssertionEngine<'_>,
    ) -> Result<(), HarnessError> {
        self.reporter.block("Test ISTag");
        let output = self.config.fixtures.output_path();

        for (service, tag) in &inputs.tag_catalog {
            let variants: [(&str, Box<dyn Fn(ProbeRequest) -> ProbeRequest>); 3] = [
                ("with 204", Box::new(|req: ProbeRequest| req)),
                ("without 204", Box::new(|req: ProbeRequest| req.no_204())),
                (
                    "with preview 0",
                    Box::new(|req: ProbeRequest| req.preview(PreviewPolicy::Window(0))),
                ),
            ];
            for (label, build) in variants {
                self.reporter.sub(&format!("{service}: {label}"));
                for case in &inputs.size_cases {
                    let input = self.config.fixtures.input_path(&case.file_name);
                    let req = build(ProbeRequest::new(service, &input, &output));
                    let trace = self.probe.invoke(&req).await?;
                    let actual = parse_istag(&trace);
                    engine.assert_tag(service, tag, actual.as_deref());
                }
            }
        }
        Ok(())
    }

    async fn probe_status(&self, req: &ProbeRequest) -> Result<ParsedResponse, HarnessError> {
        let trace = self.probe.invoke(req).await?;
        Ok(parse_status(&trace))
    }
}

fn mode_title(mode: &AdaptationMode) -> &'static str {
    match mode {
        AdaptationMode::Respmod => "Response",
        AdaptationMode::Reqmod { .. } => "Request",
    }
}
