#![warn(missing_docs)]
//! # login-sim-core
//!
//! ## Purpose
//! Defines the simulated sign-in operation and the data model shared across the
//! `login-sim` workspace.
//!
//! ## Responsibilities
//! - Represent operation outcomes and controller-owned operation state.
//! - Provide a cooperative cancellation pair built on a `watch` channel.
//! - Choose simulated durations from a configured inclusive range.
//! - Execute one cancellable wait and collapse its result into an outcome.
//! - Load and validate [`SimulationConfig`] from JSON and environment values.
//!
//! ## Data flow
//! Controller calls [`Operation::plan`] to fix the total duration, hands it to
//! [`run_operation`] together with a [`CancellationSignal`], and receives one
//! terminal [`OperationOutcome`].
//!
//! ## Ownership and lifetimes
//! Signals and handles are cheap owned clones of the same channel so the
//! cancelling side and the waiting side never borrow from each other.
//!
//! ## Error model
//! Cancellation is a normal outcome. [`OperationError`] only exists at the
//! [`Operation`] seam and is always folded into [`OperationOutcome`] by
//! [`run_operation`]. Configuration problems are [`ConfigError`] values.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use login_sim_core::{FixedDuration, OperationOutcome, SimulatedOperation, cancellation_pair};
//!
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .enable_time()
//!     .build()
//!     .expect("runtime should build");
//! let operation = SimulatedOperation::new(Arc::new(FixedDuration::new(Duration::from_millis(5))));
//! let (_handle, signal) = cancellation_pair();
//! assert_eq!(runtime.block_on(operation.run(signal)), OperationOutcome::Success);
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::watch;

/// Default lower bound of the simulated sign-in delay.
pub const DEFAULT_MIN_DELAY_MS: u64 = 10_000;

/// Default upper bound of the simulated sign-in delay.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Default cadence of progress recomputation.
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 100;

/// Env var overriding [`SimulationConfig::min_delay_ms`].
pub const ENV_MIN_DELAY_MS: &str = "LOGIN_SIM_MIN_DELAY_MS";

/// Env var overriding [`SimulationConfig::max_delay_ms`].
pub const ENV_MAX_DELAY_MS: &str = "LOGIN_SIM_MAX_DELAY_MS";

/// Env var overriding [`SimulationConfig::progress_interval_ms`].
pub const ENV_PROGRESS_INTERVAL_MS: &str = "LOGIN_SIM_PROGRESS_INTERVAL_MS";

/// Terminal result of one simulated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
    /// The wait elapsed without cancellation.
    Success,
    /// Cancellation was observed before the wait elapsed.
    Cancelled,
    /// An unexpected fault occurred while waiting.
    Failed,
}

impl OperationOutcome {
    /// Returns `true` for [`OperationOutcome::Success`].
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Stable lowercase label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state owned by a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationState {
    /// Nothing has been started yet.
    #[default]
    Idle,
    /// One operation is in flight.
    Running,
    /// The last operation produced an outcome.
    Finished(OperationOutcome),
}

impl OperationState {
    /// Returns `true` while an operation is in flight.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns the terminal outcome, if any.
    pub fn outcome(&self) -> Option<OperationOutcome> {
        match self {
            Self::Finished(outcome) => Some(*outcome),
            Self::Idle | Self::Running => None,
        }
    }
}

/// Tunables for the simulated sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Inclusive lower bound of the random delay in milliseconds.
    pub min_delay_ms: u64,
    /// Inclusive upper bound of the random delay in milliseconds.
    pub max_delay_ms: u64,
    /// Progress recomputation cadence in milliseconds.
    pub progress_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: DEFAULT_MIN_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
        }
    }
}

impl SimulationConfig {
    /// Checks range and interval constraints.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidRange`] when `min_delay_ms > max_delay_ms`.
    /// - [`ConfigError::ZeroMaxDelay`] when `max_delay_ms == 0`.
    /// - [`ConfigError::ZeroProgressInterval`] when the interval is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::InvalidRange {
                min_ms: self.min_delay_ms,
                max_ms: self.max_delay_ms,
            });
        }
        if self.max_delay_ms == 0 {
            return Err(ConfigError::ZeroMaxDelay);
        }
        if self.progress_interval_ms == 0 {
            return Err(ConfigError::ZeroProgressInterval);
        }
        Ok(())
    }

    /// Parses and validates a JSON document. Missing fields take defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown fields and
    /// any [`SimulationConfig::validate`] error.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `LOGIN_SIM_*` overrides from the process environment.
    ///
    /// # Errors
    /// See [`SimulationConfig::with_overrides_from`].
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup and re-validates.
    ///
    /// Semantics:
    /// - Missing key => field unchanged.
    /// - Value must parse as unsigned milliseconds after trimming.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidEnv`] for unparsable values and any
    /// [`SimulationConfig::validate`] error for the merged result.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (key, field) in [
            (ENV_MIN_DELAY_MS, &mut self.min_delay_ms),
            (ENV_MAX_DELAY_MS, &mut self.max_delay_ms),
            (ENV_PROGRESS_INTERVAL_MS, &mut self.progress_interval_ms),
        ] {
            if let Some(raw) = lookup(key) {
                *field = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidEnv {
                        key: key.to_string(),
                        value: raw.clone(),
                    })?;
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Progress cadence as a [`Duration`].
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Lower bound exceeds upper bound.
    #[error("invalid delay range: min {min_ms}ms exceeds max {max_ms}ms")]
    InvalidRange {
        /// Configured lower bound.
        min_ms: u64,
        /// Configured upper bound.
        max_ms: u64,
    },
    /// Upper bound must be positive.
    #[error("max delay must be greater than zero")]
    ZeroMaxDelay,
    /// Progress cadence must be positive.
    #[error("progress interval must be greater than zero")]
    ZeroProgressInterval,
    /// JSON document could not be decoded.
    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),
    /// Override value is not an unsigned integer.
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv {
        /// Offending key.
        key: String,
        /// Raw value as read.
        value: String,
    },
}

/// Creates a connected cancellation handle and signal.
pub fn cancellation_pair() -> (CancellationHandle, CancellationSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        CancellationHandle {
            sender: Arc::new(sender),
        },
        CancellationSignal { receiver },
    )
}

/// Requesting side of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancellationHandle {
    /// Requests cancellation. Returns `true` only for the call that flipped
    /// the flag; later calls are no-ops.
    pub fn cancel(&self) -> bool {
        self.sender.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Observing side of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    receiver: watch::Receiver<bool>,
}

impl CancellationSignal {
    /// Signal that can never fire.
    pub fn never() -> Self {
        let (_sender, receiver) = watch::channel(false);
        Self { receiver }
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves when cancellation is requested.
    ///
    /// If every handle is dropped without cancelling, nobody can cancel any
    /// more and the future stays pending.
    pub async fn cancelled(&mut self) {
        let closed = self.receiver.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Chooses how long one simulated run lasts.
pub trait DurationSource: Send + Sync {
    /// Returns the duration of the next run.
    fn next_duration(&self) -> Duration;
}

/// Uniform random duration over an inclusive millisecond range.
#[derive(Debug)]
pub struct RandomDuration {
    min_ms: u64,
    max_ms: u64,
    rng: Mutex<StdRng>,
}

impl RandomDuration {
    /// Creates an OS-seeded source.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidRange`] when `min_ms > max_ms`.
    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self, ConfigError> {
        Self::with_rng(min_ms, max_ms, StdRng::from_os_rng())
    }

    /// Creates a reproducible source from a fixed seed.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidRange`] when `min_ms > max_ms`.
    pub fn seeded(min_ms: u64, max_ms: u64, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(min_ms, max_ms, StdRng::seed_from_u64(seed))
    }

    /// Creates an OS-seeded source from validated configuration.
    ///
    /// # Errors
    /// Returns any [`SimulationConfig::validate`] error.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::new(config.min_delay_ms, config.max_delay_ms)
    }

    fn with_rng(min_ms: u64, max_ms: u64, rng: StdRng) -> Result<Self, ConfigError> {
        if min_ms > max_ms {
            return Err(ConfigError::InvalidRange { min_ms, max_ms });
        }
        Ok(Self {
            min_ms,
            max_ms,
            rng: Mutex::new(rng),
        })
    }
}

impl DurationSource for RandomDuration {
    fn next_duration(&self) -> Duration {
        let millis = match self.rng.lock() {
            Ok(mut rng) => rng.random_range(self.min_ms..=self.max_ms),
            Err(poisoned) => poisoned.into_inner().random_range(self.min_ms..=self.max_ms),
        };
        Duration::from_millis(millis)
    }
}

/// Always returns the same duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDuration(Duration);

impl FixedDuration {
    /// Creates a fixed source.
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    /// Creates a fixed source from milliseconds.
    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }
}

impl DurationSource for FixedDuration {
    fn next_duration(&self) -> Duration {
        self.0
    }
}

/// Failure raised inside an [`Operation`] before outcome mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// Cancellation was observed.
    #[error("operation cancelled")]
    Cancelled,
    /// Any other fault while waiting.
    #[error("operation fault: {0}")]
    Fault(String),
}

/// Unit of work driven by a controller.
pub trait Operation: Send + Sync + 'static {
    /// Fixes the total duration of the next run.
    fn plan(&self) -> Duration;

    /// Performs one planned run, honoring `signal` at its suspension points.
    fn execute(
        &self,
        duration: Duration,
        signal: CancellationSignal,
    ) -> impl Future<Output = Result<(), OperationError>> + Send;
}

/// Executes a planned run and folds its result into an outcome.
pub async fn run_operation<O: Operation>(
    operation: &O,
    duration: Duration,
    signal: CancellationSignal,
) -> OperationOutcome {
    match operation.execute(duration, signal).await {
        Ok(()) => OperationOutcome::Success,
        Err(OperationError::Cancelled) => OperationOutcome::Cancelled,
        Err(error) => {
            tracing::warn!(%error, "operation faulted; reporting failure");
            OperationOutcome::Failed
        }
    }
}

/// Stub sign-in service: waits for a chosen duration unless cancelled.
#[derive(Clone)]
pub struct SimulatedOperation {
    source: Arc<dyn DurationSource>,
}

impl SimulatedOperation {
    /// Creates an operation drawing durations from `source`.
    pub fn new(source: Arc<dyn DurationSource>) -> Self {
        Self { source }
    }

    /// Creates an operation with an OS-seeded random range from `config`.
    ///
    /// # Errors
    /// Returns any [`SimulationConfig::validate`] error.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(Arc::new(RandomDuration::from_config(config)?)))
    }

    /// Chooses a duration and waits for it.
    pub async fn run(&self, signal: CancellationSignal) -> OperationOutcome {
        let duration = self.plan();
        self.run_for(duration, signal).await
    }

    /// Waits for an already chosen duration.
    pub async fn run_for(&self, duration: Duration, signal: CancellationSignal) -> OperationOutcome {
        run_operation(self, duration, signal).await
    }
}

impl fmt::Debug for SimulatedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedOperation").finish_non_exhaustive()
    }
}

impl Operation for SimulatedOperation {
    fn plan(&self) -> Duration {
        self.source.next_duration()
    }

    async fn execute(
        &self,
        duration: Duration,
        mut signal: CancellationSignal,
    ) -> Result<(), OperationError> {
        // Elapsed wait wins a tie with a cancel arriving at the same instant.
        tokio::select! {
            biased;
            () = tokio::time::sleep(duration) => Ok(()),
            () = signal.cancelled() => Err(OperationError::Cancelled),
        }
    }
}
