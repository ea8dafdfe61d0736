//! Integration tests for controller state transitions and misuse handling.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{collect_until_finished, drain, finished_outcomes, fixed_harness};
use login_sim_app::{ControllerError, OperationController};
use login_sim_auth::NoPostSuccessAction;
use login_sim_core::{OperationOutcome, OperationState, SimulationConfig};
use login_sim_ui::{ButtonState, ControllerEvent};

#[tokio::test(start_paused = true)]
async fn controller_lifecycle_tests_start_moves_idle_to_running() {
    let mut harness = fixed_harness(10_000);
    assert_eq!(harness.controller.state(), OperationState::Idle);
    assert_eq!(harness.controller.total_duration(), None);

    let total = harness.controller.start().expect("first start should succeed");
    assert_eq!(total, Duration::from_millis(10_000));
    assert_eq!(harness.controller.state(), OperationState::Running);
    assert_eq!(harness.controller.total_duration(), Some(total));

    let events = drain(&mut harness.events);
    assert_eq!(
        events,
        vec![
            ControllerEvent::StateChanged(OperationState::Running),
            ControllerEvent::ProgressChanged(0),
            ControllerEvent::StatusChanged(login_sim_ui::STATUS_SIGNING_IN.to_string()),
            ControllerEvent::ButtonsChanged(ButtonState::RUNNING),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn controller_lifecycle_tests_rejects_start_while_running() {
    let mut harness = fixed_harness(10_000);
    harness.controller.start().expect("first start should succeed");
    drain(&mut harness.events);

    let error = harness
        .controller
        .start()
        .expect_err("second start must be rejected");
    assert!(matches!(error, ControllerError::AlreadyRunning));
    assert_eq!(harness.controller.state(), OperationState::Running);
    assert!(drain(&mut harness.events).is_empty());

    let events = collect_until_finished(&mut harness.events).await;
    assert_eq!(finished_outcomes(&events), vec![OperationOutcome::Success]);
    assert_eq!(harness.action.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn controller_lifecycle_tests_cancel_before_start_is_ignored() {
    let mut harness = fixed_harness(3_000);
    assert!(!harness.controller.cancel());
    assert!(drain(&mut harness.events).is_empty());

    harness.controller.start().expect("start should succeed");
    let events = collect_until_finished(&mut harness.events).await;
    assert_eq!(finished_outcomes(&events), vec![OperationOutcome::Success]);
}

#[tokio::test(start_paused = true)]
async fn controller_lifecycle_tests_double_cancel_yields_one_cancelled() {
    let mut harness = fixed_harness(20_000);
    harness.controller.start().expect("start should succeed");
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(harness.controller.cancel());
    assert!(!harness.controller.cancel());

    let events = collect_until_finished(&mut harness.events).await;
    assert_eq!(harness.controller.wait().await, Some(OperationOutcome::Cancelled));

    let mut all = events;
    all.extend(drain(&mut harness.events));
    assert_eq!(finished_outcomes(&all), vec![OperationOutcome::Cancelled]);
    let cancelling = all
        .iter()
        .filter(|event| **event == ControllerEvent::ButtonsChanged(ButtonState::CANCELLING))
        .count();
    assert_eq!(cancelling, 1);
}

#[tokio::test(start_paused = true)]
async fn controller_lifecycle_tests_finished_can_restart() {
    let mut harness = fixed_harness(1_000);
    harness.controller.start().expect("start should succeed");
    collect_until_finished(&mut harness.events).await;
    assert_eq!(
        harness.controller.state(),
        OperationState::Finished(OperationOutcome::Success)
    );
    assert!(!harness.controller.cancel());

    harness.controller.start().expect("restart should succeed");
    assert_eq!(harness.controller.state(), OperationState::Running);
    let events = collect_until_finished(&mut harness.events).await;
    assert_eq!(finished_outcomes(&events), vec![OperationOutcome::Success]);
    assert_eq!(harness.action.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn controller_lifecycle_tests_dispose_cancels_and_is_idempotent() {
    let mut harness = fixed_harness(30_000);
    harness.controller.start().expect("start should succeed");
    tokio::time::sleep(Duration::from_millis(2_000)).await;

    harness.controller.dispose();
    harness.controller.dispose();

    assert_eq!(harness.controller.wait().await, Some(OperationOutcome::Cancelled));
    let events = drain(&mut harness.events);
    assert_eq!(finished_outcomes(&events), vec![OperationOutcome::Cancelled]);
    assert!(matches!(
        harness.controller.start(),
        Err(ControllerError::Disposed)
    ));
    assert_eq!(harness.action.calls(), 0);
}

#[test]
fn controller_lifecycle_tests_requires_a_runtime() {
    let (sink, _events) = tokio::sync::mpsc::unbounded_channel();
    let result = OperationController::simulated(
        SimulationConfig::default(),
        sink,
        Arc::new(NoPostSuccessAction),
    );
    assert!(matches!(result, Err(ControllerError::NoRuntime)));
}

#[tokio::test]
async fn controller_lifecycle_tests_rejects_invalid_config() {
    let (sink, _events) = tokio::sync::mpsc::unbounded_channel();
    let config = SimulationConfig {
        min_delay_ms: 40_000,
        ..SimulationConfig::default()
    };
    let result = OperationController::simulated(config, sink, Arc::new(NoPostSuccessAction));
    assert!(matches!(result, Err(ControllerError::Config(_))));
}
