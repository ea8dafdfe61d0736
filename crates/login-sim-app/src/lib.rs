#![warn(missing_docs)]
//! # login-sim-app
//!
//! ## Purpose
//! Orchestrates the simulated sign-in, the session flag, and dialog state for
//! `login-sim`.
//!
//! ## Responsibilities
//! - Run at most one cancellable sign-in per [`OperationController`].
//! - Estimate progress from the recorded total duration.
//! - Marshal every notification to the observer through an [`EventSink`].
//! - Load runtime configuration from an optional JSON file plus env overrides.
//!
//! ## Data flow
//! Shell calls [`OperationController::start`] -> operation waits on the tokio
//! runtime -> progress and terminal events flow through the sink -> observer
//! reduces them into `login_sim_ui::DialogState`.
//!
//! ## Ownership and lifetimes
//! Controller bookkeeping sits behind one short-lived lock shared with the
//! spawned driver task; the observer only ever sees owned event values.
//!
//! ## Error model
//! Operation faults become `Failed` outcomes and never reach the observer as
//! errors. Misuse (`start` while running, after dispose) returns
//! [`ControllerError`]. Config loading failures are [`AppError`].

mod controller;

use std::path::PathBuf;

use login_sim_core::{ConfigError, SimulationConfig};
use thiserror::Error;

pub use controller::{
    ControllerError, EventSink, OperationController, SinkClosed, progress_percent,
};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("LOGIN_SIM_VERSION");

/// Env var naming an optional JSON config file.
pub const ENV_CONFIG_PATH: &str = "LOGIN_SIM_CONFIG";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Loads configuration from the process environment.
///
/// # Errors
/// See [`load_config_from`].
pub fn load_config() -> Result<SimulationConfig, AppError> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Loads configuration through an arbitrary key lookup.
///
/// Semantics:
/// - `LOGIN_SIM_CONFIG` unset => built-in defaults.
/// - `LOGIN_SIM_CONFIG` set => JSON file contents, missing fields defaulted.
/// - `LOGIN_SIM_*_MS` keys override either source.
///
/// # Errors
/// Returns [`AppError::ReadConfig`] when the file cannot be read and
/// [`AppError::Config`] for invalid contents or overrides.
pub fn load_config_from<F>(lookup: F) -> Result<SimulationConfig, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match lookup(ENV_CONFIG_PATH) {
        Some(path) => {
            let path = PathBuf::from(path);
            let raw = std::fs::read_to_string(&path).map_err(|source| AppError::ReadConfig {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(path = %path.display(), "loaded config file");
            SimulationConfig::from_json_str(&raw)?
        }
        None => SimulationConfig::default(),
    };

    Ok(base.with_overrides_from(&lookup)?)
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Config file could not be read.
    #[error("cannot read config file {}: {source}", path.display())]
    ReadConfig {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Config contents or overrides are invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Controller misuse or setup failure.
    #[error("controller error: {0}")]
    Controller(#[from] ControllerError),
}
