//! SUT process control: spawn, forced kill, bounded readiness.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use icaptest_core::config::SutConfig;
use icaptest_core::error::{ConfigError, HarnessError, LifecycleError};
use icaptest_core::sut::{BoxFuture, SutLifecycle};

use crate::snapshot::{ConfigSnapshot, SutConfigDoc};

/// Production [`SutLifecycle`]: owns the single live SUT instance.
///
/// The SUT has no readiness handshake and no graceful shutdown; every
/// transition is kill → relaunch → poll-until-accepting. Readiness is
/// bounded TCP polling with a hard timeout, so a SUT that never comes
/// up fails the run deterministically instead of racing a guessed
/// warm-up sleep.
pub struct SutController {
    binary: String,
    process_name: String,
    config_path: PathBuf,
    addr: String,
    ready_timeout: Duration,
    ready_poll: Duration,
    child: Option<Child>,
    snapshots: Vec<ConfigSnapshot>,
}

impl SutController {
    /// Build a controller from the `[sut]` harness config section.
    pub fn new(sut: &SutConfig) -> Self {
        Self {
            binary: sut.binary.clone(),
            process_name: sut.process_name.clone(),
            config_path: PathBuf::from(&sut.config_path),
            addr: sut.addr(),
            ready_timeout: Duration::from_millis(sut.ready_timeout_ms),
            ready_poll: Duration::from_millis(sut.ready_poll_ms),
            child: None,
            snapshots: Vec::new(),
        }
    }

    fn spawn(&mut self) -> Result<(), LifecycleError> {
        debug!(binary = %self.binary, "spawning SUT");
        let child = Command::new(&self.binary)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| LifecycleError::SpawnFailed {
                binary: self.binary.clone(),
                reason: e.to_string(),
            })?;
        self.child = Some(child);
        Ok(())
    }

    /// Poll the SUT address until it accepts a connection.
    async fn await_ready(&self) -> Result<(), LifecycleError> {
        let start = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match TcpStream::connect(&self.addr).await {
                Ok(_) => {
                    debug!(addr = %self.addr, attempts, "SUT accepting connections");
                    return Ok(());
                }
                Err(_) if start.elapsed() < self.ready_timeout => {
                    sleep(self.ready_poll).await;
                }
                Err(_) => {
                    return Err(LifecycleError::NotReady {
                        addr: self.addr.clone(),
                        waited_ms: start.elapsed().as_millis() as u64,
                        attempts,
                    });
                }
            }
        }
    }

    /// Poll until the SUT address stops accepting connections.
    ///
    /// Relaunching while the old instance still holds the port would
    /// bind-fail or, worse, leave probes talking to the stale epoch.
    async fn await_port_free(&self) -> Result<(), LifecycleError> {
        let start = Instant::now();
        loop {
            match TcpStream::connect(&self.addr).await {
                Err(_) => return Ok(()),
                Ok(_) if start.elapsed() < self.ready_timeout => {
                    sleep(self.ready_poll).await;
                }
                Ok(_) => {
                    return Err(LifecycleError::KillFailed {
                        reason: format!(
                            "{} still accepting connections {}ms after kill",
                            self.addr,
                            start.elapsed().as_millis()
                        ),
                    });
                }
            }
        }
    }

    /// Forcibly terminate the held child and any stray instances.
    async fn kill(&mut self) -> Result<(), LifecycleError> {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                // Already-exited children are fine; anything else is not.
                debug!(error = %e, "kill of held SUT child reported an error");
            }
        }

        // Stray instances from a crashed earlier run match by name.
        let pkill = Command::new("pkill")
            .args(["-9", "-x", &self.process_name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| LifecycleError::KillFailed {
                reason: format!("pkill: {e}"),
            })?;
        match pkill.code() {
            // 0 = killed something, 1 = nothing matched.
            Some(0) | Some(1) => {}
            other => warn!(status = ?other, "pkill exited abnormally"),
        }

        self.await_port_free().await
    }

    async fn relaunch(&mut self) -> Result<(), LifecycleError> {
        self.kill().await?;
        self.spawn()?;
        self.await_ready().await
    }
}

impl SutLifecycle for SutController {
    fn start(&mut self) -> BoxFuture<'_, Result<(), HarnessError>> {
        Box::pin(async move {
            info!(binary = %self.binary, addr = %self.addr, "starting SUT");
            self.relaunch().await?;
            Ok(())
        })
    }

    fn reconfigure<'a>(
        &'a mut self,
        service: &'a str,
        key: &'a str,
        value: toml::Value,
    ) -> BoxFuture<'a, Result<(), HarnessError>> {
        Box::pin(async move {
            info!(service, key, value = %value, "reconfiguring SUT");
            let mut doc = SutConfigDoc::load(&self.config_path).await?;
            // Snapshot the state as it was immediately before this
            // mutation; restores unwind LIFO, one per reconfigure.
            self.snapshots.push(doc.snapshot());
            doc.set(service, key, value)?;
            doc.persist().await?;
            self.relaunch().await?;
            Ok(())
        })
    }

    fn restore(&mut self) -> BoxFuture<'_, Result<(), HarnessError>> {
        Box::pin(async move {
            let snapshot = self
                .snapshots
                .pop()
                .ok_or(HarnessError::Config(ConfigError::NoSnapshot))?;
            info!(path = %self.config_path.display(), "restoring SUT config");
            snapshot.restore().await?;
            self.relaunch().await?;
            Ok(())
        })
    }

    fn pending_restores(&self) -> usize {
        self.snapshots.len()
    }

    fn shutdown(&mut self) -> BoxFuture<'_, Result<(), HarnessError>> {
        Box::pin(async move {
            info!("shutting down SUT");
            self.kill().await?;
            Ok(())
        })
    }
}
