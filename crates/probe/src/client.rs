//! `c-icap-client` invocation and trace capture.

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use icaptest_core::config::HarnessConfig;
use icaptest_core::error::ProbeError;
use icaptest_core::sut::{AdaptationMode, BoxFuture, PreviewPolicy, ProbeInvoker, ProbeRequest, RawTrace};

/// Probe implementation shelling out to the external ICAP client.
///
/// One [`invoke`](ProbeInvoker::invoke) call is one complete protocol
/// exchange: spawn the client, wait for it to exit, capture stderr as
/// the diagnostic trace. Exchanges the SUT refuses still exit with a
/// trace; only failure to execute the client binary is an error.
pub struct CIcapClient {
    client: String,
    host: String,
    port: u16,
}

impl CIcapClient {
    /// Create a client invoker for the given binary and SUT address.
    pub fn new(client: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            client: client.into(),
            host: host.into(),
            port,
        }
    }

    /// Convenience constructor from the harness configuration.
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            config.probe.client.clone(),
            config.sut.host.clone(),
            config.sut.port,
        )
    }

    /// Render the client argv for a request (without the program name).
    ///
    /// Exposed for logging and for tests that pin the exact flag
    /// mapping.
    pub fn command_line(&self, req: &ProbeRequest) -> Vec<String> {
        let mut args = vec![
            "-i".to_owned(),
            self.host.clone(),
            "-p".to_owned(),
            self.port.to_string(),
            "-s".to_owned(),
            req.service.clone(),
            "-f".to_owned(),
            req.input_file.display().to_string(),
            "-o".to_owned(),
            req.output_file.display().to_string(),
        ];
        if let AdaptationMode::Reqmod { url } = &req.mode {
            args.push("-req".to_owned());
            args.push(url.clone());
        }
        if let Some(method) = &req.method {
            args.push("-method".to_owned());
            args.push(method.clone());
        }
        match req.preview {
            PreviewPolicy::ClientDefault => {}
            PreviewPolicy::Disabled => args.push("-nopreview".to_owned()),
            PreviewPolicy::Window(n) => {
                args.push("-w".to_owned());
                args.push(n.to_string());
            }
        }
        args.push("-v".to_owned());
        if !req.allow_204 {
            args.push("-no204".to_owned());
        }
        args
    }
}

impl ProbeInvoker for CIcapClient {
    fn invoke<'a>(&'a self, req: &'a ProbeRequest) -> BoxFuture<'a, Result<RawTrace, ProbeError>> {
        Box::pin(async move {
            // A stale capture from an earlier exchange must never
            // satisfy a content comparison.
            match tokio::fs::remove_file(&req.output_file).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ProbeError::ExecFailed {
                        reason: format!(
                            "failed to clear capture file {}: {e}",
                            req.output_file.display()
                        ),
                    });
                }
            }

            let args = self.command_line(req);
            debug!(client = %self.client, args = ?args, "invoking probe client");

            let output = Command::new(&self.client)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .output()
                .await
                .map_err(|e| ProbeError::ExecFailed {
                    reason: format!("{}: {e}", self.client),
                })?;

            if !output.status.success() {
                // Refused exchanges exit non-zero but still leave a
                // parseable trace.
                debug!(status = ?output.status.code(), "probe client exited non-zero");
            }

            Ok(RawTrace::from_bytes(&output.stderr))
        })
    }
}
