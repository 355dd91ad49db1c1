//! `icaptest run` command handler

use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use icaptest_core::config::HarnessConfig;
use icaptest_core::fixture;
use icaptest_core::sut::AdaptationMode;
use icaptest_lifecycle::{SutController, SutConfigDoc};
use icaptest_probe::CIcapClient;

use crate::assert::AssertionEngine;
use crate::cli::{ModeArg, OutputFormat, RunArgs};
use crate::error::CliError;
use crate::orchestrator::{Orchestrator, RunInputs};
use crate::output::{OutputWriter, Reporter};
use crate::report::RunReport;

/// Execute the `run` command: the full conformance matrix.
///
/// The process exit code distinguishes harness faults from SUT
/// nonconformance: any failed assertion surfaces as
/// [`CliError::TestsFailed`] after the report is rendered.
pub async fn execute(
    args: RunArgs,
    config: &HarnessConfig,
    writer: &OutputWriter,
    format: OutputFormat,
) -> Result<(), CliError> {
    let service_cases = fixture::load_service_cases(&config.fixtures.service_cases_path())?;
    let size_cases = fixture::load_size_cases(&config.fixtures.size_cases_path())?;
    info!(
        service_cases = service_cases.len(),
        size_cases = size_cases.len(),
        "fixtures loaded"
    );

    let tag_catalog = if args.skip_tag_checks {
        Vec::new()
    } else {
        load_tag_catalog(config).await?
    };

    let modes: Vec<AdaptationMode> = args
        .modes
        .iter()
        .map(|mode| match mode {
            ModeArg::Resp => AdaptationMode::Respmod,
            ModeArg::Req => AdaptationMode::Reqmod {
                url: config.probe.request_url.clone(),
            },
        })
        .collect();

    let inputs = RunInputs {
        service_cases,
        size_cases,
        tag_catalog,
    };

    let mut controller = SutController::new(&config.sut);
    let probe = CIcapClient::from_config(config);
    let reporter = Reporter::new(format);
    let mut engine = AssertionEngine::new(&reporter);

    let started_at = Utc::now();
    let clock = Instant::now();

    Orchestrator::new(config, &mut controller, &probe, &reporter)
        .run(&inputs, &modes, &mut engine)
        .await?;

    let tally = engine.tally();
    let report = RunReport::new(tally, started_at, clock.elapsed().as_secs());
    writer.render(&report)?;

    if tally.is_success() {
        info!(total = tally.total(), "conformance run passed");
        Ok(())
    } else {
        Err(CliError::TestsFailed {
            failed: tally.failed,
        })
    }
}

/// Read (service, expected ISTag) pairs from the SUT's own config.
async fn load_tag_catalog(config: &HarnessConfig) -> Result<Vec<(String, String)>, CliError> {
    let doc = SutConfigDoc::load(&config.sut.config_path).await?;
    let mut catalog = Vec::new();
    for service in doc.services() {
        match doc.service_tag(&service) {
            Some(tag) => catalog.push((service, tag)),
            None => warn!(service, "service has no service_tag, skipping tag sweep"),
        }
    }
    Ok(catalog)
}
