//! Drives one simulated sign-in at a time and reports its lifecycle to an
//! observer through an [`EventSink`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use login_sim_auth::PostSuccessAction;
use login_sim_core::{
    CancellationHandle, CancellationSignal, ConfigError, Operation, OperationOutcome,
    OperationState, SimulatedOperation, SimulationConfig, cancellation_pair, run_operation,
};
use login_sim_ui::{
    ButtonState, ControllerEvent, STATUS_CANCELLING, STATUS_SIGNING_IN, closes_dialog,
    status_for_outcome,
};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Delivers controller events to the context the observer owns.
///
/// Implementations must not block; the controller calls them from runtime
/// worker threads.
pub trait EventSink: Send + Sync + 'static {
    /// Hands one event to the observer.
    ///
    /// # Errors
    /// Returns [`SinkClosed`] once the observer stopped listening.
    fn deliver(&self, event: ControllerEvent) -> Result<(), SinkClosed>;
}

/// Observer side of a sink has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("observer is no longer receiving events")]
pub struct SinkClosed;

impl EventSink for tokio::sync::mpsc::UnboundedSender<ControllerEvent> {
    fn deliver(&self, event: ControllerEvent) -> Result<(), SinkClosed> {
        self.send(event).map_err(|_| SinkClosed)
    }
}

impl EventSink for std::sync::mpsc::Sender<ControllerEvent> {
    fn deliver(&self, event: ControllerEvent) -> Result<(), SinkClosed> {
        self.send(event).map_err(|_| SinkClosed)
    }
}

/// Controller error type.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// `start` was called while an operation is in flight.
    #[error("an operation is already running")]
    AlreadyRunning,
    /// The controller was disposed.
    #[error("controller has been disposed")]
    Disposed,
    /// Construction happened outside a tokio runtime.
    #[error("no tokio runtime available to run operations")]
    NoRuntime,
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Linear progress estimate of `elapsed` against `total`, clamped to 0-100.
pub fn progress_percent(elapsed: Duration, total: Duration) -> u8 {
    if total.is_zero() {
        return 100;
    }
    let percent = elapsed.as_nanos().saturating_mul(100) / total.as_nanos();
    percent.min(100) as u8
}

struct ActiveRun {
    generation: u64,
    cancel: CancellationHandle,
}

#[derive(Default)]
struct Inner {
    state: OperationState,
    generation: u64,
    last_total: Option<Duration>,
    active: Option<ActiveRun>,
    driver: Option<JoinHandle<()>>,
    disposed: bool,
}

struct Shared<O> {
    operation: Arc<O>,
    config: SimulationConfig,
    sink: Box<dyn EventSink>,
    post_success: Arc<dyn PostSuccessAction>,
    inner: Mutex<Inner>,
}

impl<O: Operation> Shared<O> {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ControllerEvent) {
        if let Err(error) = self.sink.deliver(event) {
            tracing::debug!(%error, "dropping controller event");
        }
    }

    fn report_progress(&self, generation: u64, progress: u8) {
        let inner = self.lock();
        if inner.generation == generation && inner.state.is_running() {
            self.emit(ControllerEvent::ProgressChanged(progress));
        }
    }

    fn finish(&self, generation: u64, outcome: OperationOutcome, last_progress: u8) {
        let mut inner = self.lock();
        if inner.generation != generation || !inner.state.is_running() {
            tracing::debug!(generation, %outcome, "ignoring outcome of a stale run");
            return;
        }

        inner.active = None;
        inner.state = OperationState::Finished(outcome);

        if outcome.is_success() && last_progress < 100 {
            self.emit(ControllerEvent::ProgressChanged(100));
        }
        self.emit(ControllerEvent::StateChanged(inner.state));
        self.emit(ControllerEvent::StatusChanged(
            status_for_outcome(outcome).to_string(),
        ));
        self.emit(ControllerEvent::ButtonsChanged(ButtonState::IDLE));

        if outcome.is_success()
            && let Err(error) = self.post_success.on_success()
        {
            tracing::error!(%error, "post-success action failed");
        }

        if closes_dialog(outcome) {
            self.emit(ControllerEvent::CloseRequested(outcome));
        }

        tracing::info!(generation, %outcome, "sign-in finished");
    }
}

async fn drive<O: Operation>(
    shared: Arc<Shared<O>>,
    generation: u64,
    total: Duration,
    signal: CancellationSignal,
) {
    let operation = Arc::clone(&shared.operation);
    let mut work = tokio::spawn(async move { run_operation(&*operation, total, signal).await });

    let started = Instant::now();
    let mut ticker = tokio::time::interval(shared.config.progress_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_progress = 0_u8;

    let outcome = loop {
        tokio::select! {
            biased;
            joined = &mut work => {
                break joined.unwrap_or_else(|error| {
                    tracing::warn!(%error, "operation task aborted; reporting failure");
                    OperationOutcome::Failed
                });
            }
            _ = ticker.tick() => {
                let progress = progress_percent(started.elapsed(), total);
                if progress > last_progress {
                    last_progress = progress;
                    shared.report_progress(generation, progress);
                }
            }
        }
    };

    shared.finish(generation, outcome, last_progress);
}

async fn supervise<O: Operation>(
    shared: Arc<Shared<O>>,
    generation: u64,
    total: Duration,
    signal: CancellationSignal,
) {
    let driver = tokio::spawn(drive(Arc::clone(&shared), generation, total, signal));
    if let Err(error) = driver.await {
        tracing::error!(%error, generation, "operation driver aborted; reporting failure");
        shared.finish(generation, OperationOutcome::Failed, 0);
    }
}

/// Orchestrates one [`Operation`] run at a time.
///
/// State machine:
/// - `Idle`/`Finished` --[`start`](Self::start)--> `Running`
/// - `Running` --outcome arrives--> `Finished(outcome)`
/// - `Running` --[`cancel`](Self::cancel)--> `Running` until `Cancelled` arrives
pub struct OperationController<O: Operation = SimulatedOperation> {
    shared: Arc<Shared<O>>,
    runtime: Handle,
}

impl OperationController<SimulatedOperation> {
    /// Creates a controller over a randomly timed [`SimulatedOperation`].
    ///
    /// # Errors
    /// Returns [`ControllerError::Config`] for invalid config and
    /// [`ControllerError::NoRuntime`] outside a tokio runtime.
    pub fn simulated(
        config: SimulationConfig,
        sink: impl EventSink,
        post_success: Arc<dyn PostSuccessAction>,
    ) -> Result<Self, ControllerError> {
        let operation = SimulatedOperation::from_config(&config)?;
        Self::new(operation, config, sink, post_success)
    }
}

impl<O: Operation> OperationController<O> {
    /// Creates an idle controller.
    ///
    /// The runtime current at construction time runs every operation, so
    /// `start` and `cancel` may later be called from any thread.
    /// `post_success` runs under the controller lock and must not call back
    /// into the controller.
    ///
    /// # Errors
    /// Returns [`ControllerError::Config`] for invalid config and
    /// [`ControllerError::NoRuntime`] outside a tokio runtime.
    pub fn new(
        operation: O,
        config: SimulationConfig,
        sink: impl EventSink,
        post_success: Arc<dyn PostSuccessAction>,
    ) -> Result<Self, ControllerError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| ControllerError::NoRuntime)?;
        Ok(Self {
            shared: Arc::new(Shared {
                operation: Arc::new(operation),
                config,
                sink: Box::new(sink),
                post_success,
                inner: Mutex::new(Inner::default()),
            }),
            runtime,
        })
    }

    /// Current state snapshot.
    pub fn state(&self) -> OperationState {
        self.shared.lock().state
    }

    /// Total duration recorded by the most recent `start`.
    pub fn total_duration(&self) -> Option<Duration> {
        self.shared.lock().last_total
    }

    /// Starts a new run and returns its planned duration.
    ///
    /// # Errors
    /// - [`ControllerError::AlreadyRunning`] while a run is in flight; state is
    ///   left unchanged and nothing is launched.
    /// - [`ControllerError::Disposed`] after [`dispose`](Self::dispose).
    pub fn start(&self) -> Result<Duration, ControllerError> {
        let mut inner = self.shared.lock();
        if inner.disposed {
            return Err(ControllerError::Disposed);
        }
        if inner.state.is_running() {
            tracing::warn!(generation = inner.generation, "start rejected; already running");
            return Err(ControllerError::AlreadyRunning);
        }

        let total = self.shared.operation.plan();
        inner.generation += 1;
        let generation = inner.generation;
        let (cancel, signal) = cancellation_pair();

        inner.state = OperationState::Running;
        inner.last_total = Some(total);
        inner.active = Some(ActiveRun { generation, cancel });

        self.shared.emit(ControllerEvent::StateChanged(inner.state));
        self.shared.emit(ControllerEvent::ProgressChanged(0));
        self.shared
            .emit(ControllerEvent::StatusChanged(STATUS_SIGNING_IN.to_string()));
        self.shared
            .emit(ControllerEvent::ButtonsChanged(ButtonState::RUNNING));

        inner.driver = Some(self.runtime.spawn(supervise(
            Arc::clone(&self.shared),
            generation,
            total,
            signal,
        )));

        tracing::info!(generation, total_ms = total.as_millis() as u64, "sign-in started");
        Ok(total)
    }

    /// Requests cancellation of the in-flight run.
    ///
    /// Returns `true` only for the call that actually requested it; calls while
    /// idle, finished, or already cancelling are no-ops.
    pub fn cancel(&self) -> bool {
        let inner = self.shared.lock();
        let Some(active) = inner.active.as_ref() else {
            tracing::debug!("cancel ignored; nothing running");
            return false;
        };
        if !active.cancel.cancel() {
            return false;
        }

        self.shared
            .emit(ControllerEvent::StatusChanged(STATUS_CANCELLING.to_string()));
        self.shared
            .emit(ControllerEvent::ButtonsChanged(ButtonState::CANCELLING));
        tracing::info!(generation = active.generation, "cancellation requested");
        true
    }

    /// Cancels any in-flight run and refuses further starts. Idempotent.
    ///
    /// The cancelled run still reports its outcome and then releases its
    /// progress timer.
    pub fn dispose(&self) {
        let mut inner = self.shared.lock();
        if inner.disposed {
            return;
        }
        inner.disposed = true;
        if let Some(active) = inner.active.as_ref() {
            active.cancel.cancel();
        }
        tracing::debug!(generation = inner.generation, "controller disposed");
    }

    /// Waits for the current run, if any, and returns the latest outcome.
    pub async fn wait(&self) -> Option<OperationOutcome> {
        let driver = self.shared.lock().driver.take();
        if let Some(driver) = driver
            && let Err(error) = driver.await
        {
            tracing::warn!(%error, "operation driver ended abnormally");
        }
        self.state().outcome()
    }
}

impl<O: Operation> Drop for OperationController<O> {
    fn drop(&mut self) {
        self.dispose();
    }
}
