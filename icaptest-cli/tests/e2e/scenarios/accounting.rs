//! Tally bookkeeping across full matrix runs.

use crate::helpers::doubles::*;
use crate::helpers::env::*;

use icaptest_cli::assert::AssertionEngine;
use icaptest_cli::orchestrator::Orchestrator;
use icaptest_cli::output::Reporter;

/// A conforming SUT passes every assertion, and the tally covers the
/// whole matrix exactly once per assertion.
#[tokio::test]
async fn conforming_run_passes_the_full_matrix() {
    let env = TestEnv::new();
    let log = new_event_log();
    let state = SimState::new();
    let probe = CannedProbe::new(log.clone(), state.clone());
    let mut lifecycle = RecordingLifecycle::new(log, state);
    let reporter = Reporter::silent();
    let mut engine = AssertionEngine::new(&reporter);

    let inputs = env.inputs();
    let modes = env.both_modes();
    Orchestrator::new(&env.config, &mut lifecycle, &probe, &reporter)
        .run(&inputs, &modes, &mut engine)
        .await
        .unwrap();

    let tally = engine.tally();
    assert_eq!(tally.total(), expected_total(&inputs, modes.len()));
    assert_eq!(tally.failed, 0, "conforming SUT must pass everything");
    assert!(tally.is_success());
}

/// Assertion failures never stop the run: a SUT that refuses every
/// body still sees the complete matrix, and passed + failed equals the
/// number of assertions issued.
#[tokio::test]
async fn refusing_sut_fails_assertions_but_completes_the_matrix() {
    let env = TestEnv::new();
    let log = new_event_log();
    let state = SimState::new();
    let mut probe = CannedProbe::new(log.clone(), state.clone());
    probe.refuse_all = true;
    let mut lifecycle = RecordingLifecycle::new(log, state);
    let reporter = Reporter::silent();
    let mut engine = AssertionEngine::new(&reporter);

    let inputs = env.inputs();
    let modes = env.both_modes();
    Orchestrator::new(&env.config, &mut lifecycle, &probe, &reporter)
        .run(&inputs, &modes, &mut engine)
        .await
        .expect("assertion failures must not abort the run");

    let tally = engine.tally();
    assert_eq!(tally.total(), expected_total(&inputs, modes.len()));
    assert_eq!(tally.passed + tally.failed, tally.total());
    assert!(tally.failed > 0);
    assert!(!tally.is_success());
    // The manifest's FAILED rows and the status-only sweeps still
    // pass even against a refusing SUT.
    assert!(tally.passed > 0);
}

/// Narrowing to one mode halves the mode-dependent share of the
/// matrix without touching the service or tag sweeps.
#[tokio::test]
async fn single_mode_run_issues_the_expected_share() {
    let env = TestEnv::new();
    let log = new_event_log();
    let state = SimState::new();
    let probe = CannedProbe::new(log.clone(), state.clone());
    let mut lifecycle = RecordingLifecycle::new(log, state);
    let reporter = Reporter::silent();
    let mut engine = AssertionEngine::new(&reporter);

    let inputs = env.inputs();
    let modes = env.both_modes();
    Orchestrator::new(&env.config, &mut lifecycle, &probe, &reporter)
        .run(&inputs, &modes[..1], &mut engine)
        .await
        .unwrap();

    assert_eq!(engine.tally().total(), expected_total(&inputs, 1));
    assert_eq!(probe.invocations() as u32, expected_total(&inputs, 1));
}
