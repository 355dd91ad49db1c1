//! Sweep ordering and configuration-epoch pairing.
//!
//! Assertions made against the wrong configuration epoch are silently
//! wrong results, so the bracketing of config-sensitive blocks is the
//! property these tests pin hardest.

use crate::helpers::doubles::*;
use crate::helpers::env::*;

use icaptest_core::error::{ConfigError, HarnessError, ProbeError};
use icaptest_core::sut::{AdaptationMode, SutLifecycle};

use icaptest_cli::assert::AssertionEngine;
use icaptest_cli::orchestrator::Orchestrator;
use icaptest_cli::output::Reporter;

/// Full conforming run: every reconfigure is matched by a restore and
/// nothing is left pending after teardown.
#[tokio::test]
async fn full_run_brackets_every_reconfigure_with_a_restore() {
    let env = TestEnv::new();
    let log = new_event_log();
    let state = SimState::new();
    let probe = CannedProbe::new(log.clone(), state.clone());
    let mut lifecycle = RecordingLifecycle::new(log.clone(), state);
    let reporter = Reporter::silent();
    let mut engine = AssertionEngine::new(&reporter);

    let inputs = env.inputs();
    Orchestrator::new(&env.config, &mut lifecycle, &probe, &reporter)
        .run(&inputs, &env.both_modes(), &mut engine)
        .await
        .expect("conforming run should not abort");

    let events = snapshot_log(&log);
    let reconfigures = events
        .iter()
        .filter(|e| matches!(e, Event::Reconfigure { .. }))
        .count();
    let restores = events.iter().filter(|e| matches!(e, Event::Restore)).count();

    // Prime (2 keys) + 2 config-sensitive blocks per mode.
    assert_eq!(reconfigures, 2 + 2 * 2);
    assert_eq!(restores, reconfigures, "every reconfigure pairs with a restore");
    assert_eq!(lifecycle.pending_restores(), 0);

    assert_eq!(events.first(), Some(&Event::Start));
    assert_eq!(events.last(), Some(&Event::Shutdown));
}

/// File sweeps visit manifest rows in fixture order, never shuffled.
#[tokio::test]
async fn sweeps_iterate_fixture_order() {
    let env = TestEnv::new();
    let log = new_event_log();
    let state = SimState::new();
    let probe = CannedProbe::new(log.clone(), state.clone());
    let mut lifecycle = RecordingLifecycle::new(log.clone(), state);
    let reporter = Reporter::silent();
    let mut engine = AssertionEngine::new(&reporter);

    let inputs = env.inputs();
    Orchestrator::new(&env.config, &mut lifecycle, &probe, &reporter)
        .run(&inputs, &[AdaptationMode::Respmod], &mut engine)
        .await
        .unwrap();

    let events = snapshot_log(&log);
    let probes: Vec<(&str, &str)> = events
        .iter()
        .filter_map(|e| match e {
            Event::Probe { service, file, .. } => Some((service.as_str(), file.as_str())),
            _ => None,
        })
        .collect();

    // Service-name sweeps come first, in fixture order, twice.
    let service_sweep = 2 * inputs.service_cases.len();
    let sweep_services: Vec<&str> = probes[..service_sweep].iter().map(|p| p.0).collect();
    assert_eq!(sweep_services, ["echo", "ech", "echo", "ech"]);

    // The 204-header sweep and the plain sweep follow, each walking
    // the manifest in order.
    let files: Vec<&str> = probes[service_sweep..service_sweep + 4]
        .iter()
        .map(|p| p.1)
        .collect();
    assert_eq!(files, [SMALL_FILE, BIG_FILE, SMALL_FILE, BIG_FILE]);
}

/// Probes of the size-limit sweep happen strictly inside its
/// reconfigure/restore epoch.
#[tokio::test]
async fn size_limit_probes_run_inside_their_epoch() {
    let env = TestEnv::new();
    let log = new_event_log();
    let state = SimState::new();
    let probe = CannedProbe::new(log.clone(), state.clone());
    let mut lifecycle = RecordingLifecycle::new(log.clone(), state);
    let reporter = Reporter::silent();
    let mut engine = AssertionEngine::new(&reporter);

    let inputs = env.inputs();
    Orchestrator::new(&env.config, &mut lifecycle, &probe, &reporter)
        .run(&inputs, &[AdaptationMode::Respmod], &mut engine)
        .await
        .unwrap();

    let events = snapshot_log(&log);
    let start = events
        .iter()
        .position(|e| {
            matches!(e, Event::Reconfigure { key, .. } if key == "max_filesize")
        })
        .expect("size-limit block must reconfigure");
    let end = events[start..]
        .iter()
        .position(|e| matches!(e, Event::Restore))
        .map(|offset| start + offset)
        .expect("size-limit block must restore");

    let inside: Vec<&Event> = events[start + 1..end].iter().collect();
    assert_eq!(inside.len(), inputs.size_cases.len());
    assert!(inside.iter().all(|e| e.is_probe()));
}

/// A failed configuration mutation aborts the remaining scenarios but
/// teardown still drains outstanding epochs and shuts the SUT down.
#[tokio::test]
async fn config_mutation_failure_aborts_and_still_tears_down() {
    let env = TestEnv::new();
    let log = new_event_log();
    let state = SimState::new();
    let probe = CannedProbe::new(log.clone(), state.clone());
    let mut lifecycle = RecordingLifecycle::new(log.clone(), state);
    lifecycle.fail_on_key = Some("max_filesize".to_owned());
    let reporter = Reporter::silent();
    let mut engine = AssertionEngine::new(&reporter);

    let inputs = env.inputs();
    let err = Orchestrator::new(&env.config, &mut lifecycle, &probe, &reporter)
        .run(&inputs, &env.both_modes(), &mut engine)
        .await
        .expect_err("config mutation failure must abort the run");

    assert!(matches!(
        err,
        HarnessError::Config(ConfigError::WriteFailed { .. })
    ));
    assert_eq!(lifecycle.pending_restores(), 0, "teardown must drain epochs");

    let events = snapshot_log(&log);
    assert_eq!(events.last(), Some(&Event::Shutdown));

    // Only the first mode reached its size-limit block; later blocks
    // and the second mode never ran.
    let reqmod_probes = events
        .iter()
        .filter(|e| matches!(e, Event::Probe { req_mode: true, .. }))
        .count();
    assert_eq!(reqmod_probes, 0);
}

/// A probe exec failure mid-sweep aborts too, with the same teardown
/// guarantees.
#[tokio::test]
async fn probe_exec_failure_aborts_and_still_restores() {
    let env = TestEnv::new();
    let log = new_event_log();
    let state = SimState::new();
    let mut probe = CannedProbe::new(log.clone(), state.clone());
    // Service sweeps (4 probes) + 204 header sweep (2) + plain sweep
    // (2) land us inside the size-limit sweep at probe 9.
    probe.fail_at = Some(9);
    let mut lifecycle = RecordingLifecycle::new(log.clone(), state);
    let reporter = Reporter::silent();
    let mut engine = AssertionEngine::new(&reporter);

    let inputs = env.inputs();
    let err = Orchestrator::new(&env.config, &mut lifecycle, &probe, &reporter)
        .run(&inputs, &env.both_modes(), &mut engine)
        .await
        .expect_err("probe exec failure must abort the run");

    assert!(matches!(err, HarnessError::Probe(ProbeError::ExecFailed { .. })));
    assert_eq!(lifecycle.pending_restores(), 0);

    let events = snapshot_log(&log);
    let reconfigures = events
        .iter()
        .filter(|e| matches!(e, Event::Reconfigure { .. }))
        .count();
    let restores = events.iter().filter(|e| matches!(e, Event::Restore)).count();
    assert_eq!(reconfigures, restores);
    assert_eq!(events.last(), Some(&Event::Shutdown));
}
