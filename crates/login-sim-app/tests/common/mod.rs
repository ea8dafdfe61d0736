//! Shared fixtures for controller integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use login_sim_app::OperationController;
use login_sim_auth::{PostSuccessAction, SessionError};
use login_sim_core::{
    CancellationSignal, FixedDuration, Operation, OperationError, OperationOutcome,
    OperationState, SimulatedOperation, SimulationConfig,
};
use login_sim_ui::ControllerEvent;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

/// Post-success hook that counts invocations.
#[derive(Debug, Default)]
pub struct CountingAction {
    calls: AtomicUsize,
}

impl CountingAction {
    /// Number of times the hook ran.
    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PostSuccessAction for CountingAction {
    fn on_success(&self) -> Result<(), SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Controller over a fixed-duration simulated operation plus its event stream.
pub struct Harness<O: Operation = SimulatedOperation> {
    pub controller: OperationController<O>,
    pub events: UnboundedReceiver<ControllerEvent>,
    #[allow(dead_code)]
    pub action: Arc<CountingAction>,
}

/// Builds a harness whose runs always last `duration_ms`.
#[allow(dead_code)]
pub fn fixed_harness(duration_ms: u64) -> Harness {
    let operation = SimulatedOperation::new(Arc::new(FixedDuration::from_millis(duration_ms)));
    harness_with(operation)
}

/// Builds a harness over any operation with default config.
#[allow(dead_code)]
pub fn harness_with<O: Operation>(operation: O) -> Harness<O> {
    let (sink, events) = unbounded_channel();
    let action = Arc::new(CountingAction::default());
    let controller = OperationController::new(
        operation,
        SimulationConfig::default(),
        sink,
        Arc::clone(&action) as Arc<dyn PostSuccessAction>,
    )
    .expect("controller should build inside a runtime");
    Harness {
        controller,
        events,
        action,
    }
}

/// Receives events until the first `Finished` state, then drains whatever
/// the driver emitted after it.
#[allow(dead_code)]
pub async fn collect_until_finished(
    events: &mut UnboundedReceiver<ControllerEvent>,
) -> Vec<ControllerEvent> {
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        let finished = matches!(event, ControllerEvent::StateChanged(OperationState::Finished(_)));
        collected.push(event);
        if finished {
            break;
        }
    }
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

/// Drains already queued events without waiting.
#[allow(dead_code)]
pub fn drain(events: &mut UnboundedReceiver<ControllerEvent>) -> Vec<ControllerEvent> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

/// Outcomes of every `Finished` notification in `events`.
#[allow(dead_code)]
pub fn finished_outcomes(events: &[ControllerEvent]) -> Vec<OperationOutcome> {
    events
        .iter()
        .filter_map(|event| match event {
            ControllerEvent::StateChanged(OperationState::Finished(outcome)) => Some(*outcome),
            _ => None,
        })
        .collect()
}

/// Progress values in emission order.
#[allow(dead_code)]
pub fn progress_values(events: &[ControllerEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            ControllerEvent::ProgressChanged(progress) => Some(*progress),
            _ => None,
        })
        .collect()
}

/// Operation that reports a fault after a short wait.
#[allow(dead_code)]
pub struct FaultyOperation;

impl Operation for FaultyOperation {
    fn plan(&self) -> Duration {
        Duration::from_millis(2_000)
    }

    async fn execute(
        &self,
        duration: Duration,
        _signal: CancellationSignal,
    ) -> Result<(), OperationError> {
        tokio::time::sleep(duration / 2).await;
        Err(OperationError::Fault("backend unreachable".to_string()))
    }
}

/// Operation whose task panics mid-wait.
#[allow(dead_code)]
pub struct PanickingOperation;

impl Operation for PanickingOperation {
    fn plan(&self) -> Duration {
        Duration::from_millis(1_000)
    }

    async fn execute(
        &self,
        duration: Duration,
        _signal: CancellationSignal,
    ) -> Result<(), OperationError> {
        tokio::time::sleep(duration / 2).await;
        panic!("simulated backend crash");
    }
}
