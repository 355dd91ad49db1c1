//! `icaptest probe` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use icaptest_core::config::HarnessConfig;
use icaptest_core::error::HarnessError;
use icaptest_core::sut::{AdaptationMode, PreviewPolicy, ProbeInvoker, ProbeRequest};
use icaptest_core::trace::{parse_istag, parse_status};
use icaptest_probe::CIcapClient;

use crate::cli::ProbeArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `probe` command: one exchange, parsed and printed.
///
/// A debugging aid — no assertions are made and the exit code does not
/// depend on the SUT's answer, only on the harness's own faults.
pub async fn execute(
    args: ProbeArgs,
    config: &HarnessConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let client = CIcapClient::from_config(config);
    let output_file = config.fixtures.output_path();

    let mut req = ProbeRequest::new(&args.service, &args.file, &output_file);
    if args.req_mode {
        req = req.mode(AdaptationMode::Reqmod {
            url: config.probe.request_url.clone(),
        });
    }
    if args.no204 {
        req = req.no_204();
    }
    if args.nopreview {
        req = req.preview(PreviewPolicy::Disabled);
    } else if let Some(window) = args.preview {
        req = req.preview(PreviewPolicy::Window(window));
    }
    if let Some(method) = &args.method {
        req = req.method(method.clone());
    }

    info!(service = %args.service, file = %args.file.display(), "issuing single probe");
    let trace = client.invoke(&req).await.map_err(HarnessError::from)?;
    let status = parse_status(&trace);
    let istag = parse_istag(&trace);

    let report = ProbeReport {
        service: args.service,
        status_code: status.status_code,
        status_message: status.status_message,
        istag,
        capture_file: output_file.display().to_string(),
        capture_exists: output_file.exists(),
    };
    writer.render(&report)?;
    Ok(())
}

/// Parsed result of a single exchange.
#[derive(Debug, Serialize)]
struct ProbeReport {
    service: String,
    status_code: String,
    status_message: String,
    istag: Option<String>,
    capture_file: String,
    capture_exists: bool,
}

impl Render for ProbeReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Service: {}", self.service)?;
        writeln!(w, "Status: {} {}", self.status_code, self.status_message)?;
        match &self.istag {
            Some(tag) => writeln!(w, "ISTag: {tag}")?,
            None => writeln!(w, "ISTag: (absent)")?,
        }
        if self.capture_exists {
            writeln!(w, "Capture: {}", self.capture_file)?;
        } else {
            writeln!(w, "Capture: (no file written)")?;
        }
        Ok(())
    }
}
