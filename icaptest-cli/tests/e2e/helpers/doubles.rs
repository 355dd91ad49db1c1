//! Probe and lifecycle doubles backed by a shared simulated SUT state.
//!
//! [`CannedProbe`] answers exchanges the way a conforming echo service
//! would, honouring the simulated configuration (`max_filesize`,
//! `preview_enabled`) that [`RecordingLifecycle`] mutates. Both append
//! to one ordered [`EventLog`], so tests can assert the interleaving
//! of lifecycle transitions and probes — the property the real
//! harness's correctness rests on.

use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use icaptest_core::error::{ConfigError, HarnessError, ProbeError};
use icaptest_core::sut::{
    AdaptationMode, BoxFuture, PreviewPolicy, ProbeInvoker, ProbeRequest, RawTrace, SutLifecycle,
};

/// One entry in the unified event log.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    Reconfigure { service: String, key: String },
    Restore,
    Shutdown,
    Probe {
        service: String,
        file: String,
        allow_204: bool,
        preview: PreviewPolicy,
        method: Option<String>,
        req_mode: bool,
    },
}

impl Event {
    pub fn is_probe(&self) -> bool {
        matches!(self, Event::Probe { .. })
    }
}

/// Ordered log shared by both doubles.
pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn new_event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn snapshot_log(log: &EventLog) -> Vec<Event> {
    log.lock().unwrap().clone()
}

/// The simulated SUT's live configuration.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// 0 means unlimited, matching the echo service's default.
    pub max_filesize: i64,
    pub preview_enabled: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_filesize: 0,
            preview_enabled: true,
        }
    }
}

/// Shared mutable state standing in for the SUT's persisted config.
#[derive(Default)]
pub struct SimState {
    inner: Mutex<SimConfig>,
}

impl SimState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn current(&self) -> SimConfig {
        self.inner.lock().unwrap().clone()
    }
}

/// Lifecycle double: records transitions and mutates [`SimState`]
/// instead of touching processes or files.
pub struct RecordingLifecycle {
    log: EventLog,
    state: Arc<SimState>,
    snapshots: Vec<SimConfig>,
    /// When set, `reconfigure` of this key fails like a config write
    /// failure would.
    pub fail_on_key: Option<String>,
}

impl RecordingLifecycle {
    pub fn new(log: EventLog, state: Arc<SimState>) -> Self {
        Self {
            log,
            state,
            snapshots: Vec::new(),
            fail_on_key: None,
        }
    }
}

impl SutLifecycle for RecordingLifecycle {
    fn start(&mut self) -> BoxFuture<'_, Result<(), HarnessError>> {
        Box::pin(async move {
            self.log.lock().unwrap().push(Event::Start);
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
            if self.fail_on_key.as_deref() == Some(key) {
                return Err(HarnessError::Config(ConfigError::WriteFailed {
                    path: "sim://config.toml".to_owned(),
                    reason: "injected write failure".to_owned(),
                }));
            }
            self.log.lock().unwrap().push(Event::Reconfigure {
                service: service.to_owned(),
                key: key.to_owned(),
            });
            let mut config = self.state.inner.lock().unwrap();
            self.snapshots.push(config.clone());
            match key {
                "max_filesize" => config.max_filesize = value.as_integer().unwrap_or(0),
                "preview_enabled" => config.preview_enabled = value.as_bool().unwrap_or(true),
                // Extension routing has no effect on the simulation.
                _ => {}
            }
            Ok(())
        })
    }

    fn restore(&mut self) -> BoxFuture<'_, Result<(), HarnessError>> {
        Box::pin(async move {
            let snapshot = self
                .snapshots
                .pop()
                .ok_or(HarnessError::Config(ConfigError::NoSnapshot))?;
            *self.state.inner.lock().unwrap() = snapshot;
            self.log.lock().unwrap().push(Event::Restore);
            Ok(())
        })
    }

    fn pending_restores(&self) -> usize {
        self.snapshots.len()
    }

    fn shutdown(&mut self) -> BoxFuture<'_, Result<(), HarnessError>> {
        Box::pin(async move {
            self.log.lock().unwrap().push(Event::Shutdown);
            Ok(())
        })
    }
}

/// Probe double simulating a conforming echo SUT.
///
/// Known services answer `200 OK` with their ISTag and echo the input
/// file into the capture path, unless the simulated `max_filesize`
/// rejects the body (the ICAP status stays `200 OK` in that case, as
/// the real service's does). Unknown services answer `404`. Preview
/// policy and HTTP method never change the answer — the conformance
/// property under test.
pub struct CannedProbe {
    log: EventLog,
    state: Arc<SimState>,
    tags: HashMap<String, String>,
    /// Refuse every body (no capture file is ever written).
    pub refuse_all: bool,
    /// 1-based invocation index that fails with an exec error.
    pub fail_at: Option<usize>,
    counter: AtomicUsize,
}

impl CannedProbe {
    pub fn new(log: EventLog, state: Arc<SimState>) -> Self {
        let mut tags = HashMap::new();
        tags.insert("echo".to_owned(), "ICAPEG".to_owned());
        Self {
            log,
            state,
            tags,
            refuse_all: false,
            fail_at: None,
            counter: AtomicUsize::new(0),
        }
    }

    /// Number of exchanges issued so far.
    pub fn invocations(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}

impl ProbeInvoker for CannedProbe {
    fn invoke<'a>(&'a self, req: &'a ProbeRequest) -> BoxFuture<'a, Result<RawTrace, ProbeError>> {
        Box::pin(async move {
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_at == Some(n) {
                return Err(ProbeError::ExecFailed {
                    reason: format!("injected exec failure at probe {n}"),
                });
            }

            self.log.lock().unwrap().push(Event::Probe {
                service: req.service.clone(),
                file: req
                    .input_file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                allow_204: req.allow_204,
                preview: req.preview,
                method: req.method.clone(),
                req_mode: matches!(req.mode, AdaptationMode::Reqmod { .. }),
            });

            // Like the real client: stale captures never survive.
            let _ = fs::remove_file(&req.output_file);

            let Some(tag) = self.tags.get(&req.service) else {
                return Ok(RawTrace::from_lines([
                    "ICAP/1.0 404 ICAP Service not found".to_owned(),
                ]));
            };

            let config = self.state.current();
            let accepted = !self.refuse_all
                && (config.max_filesize == 0
                    || fs::metadata(&req.input_file)
                        .map(|m| m.len() as i64 <= config.max_filesize)
                        .unwrap_or(false));
            if accepted {
                let _ = fs::copy(&req.input_file, &req.output_file);
            }

            Ok(RawTrace::from_lines([
                "ICAP/1.0 200 OK".to_owned(),
                format!("ISTag: \"{tag}\""),
            ]))
        })
    }
}
