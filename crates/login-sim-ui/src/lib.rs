#![warn(missing_docs)]
//! # login-sim-ui
//!
//! ## Purpose
//! Defines the view-facing event contract and dialog state model for
//! `login-sim`.
//!
//! ## Responsibilities
//! - Describe every notification a controller sends to its observer.
//! - Map outcomes to user-facing status text.
//! - Reduce the event stream into a renderable [`DialogState`].
//!
//! ## Data flow
//! Controller emits [`ControllerEvent`] values -> the observer drains them on
//! its own thread -> [`DialogState::apply`] updates what the shell renders.
//!
//! ## Ownership and lifetimes
//! Events and state own their strings so they can cross threads without
//! borrowing from the controller.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors.

use login_sim_core::{OperationOutcome, OperationState};

/// Status shown before the first sign-in attempt.
pub const STATUS_READY: &str = "Press Login to sign in.";

/// Status shown while the simulated sign-in runs.
pub const STATUS_SIGNING_IN: &str = "Signing in...";

/// Status shown after cancel was requested but before the outcome arrived.
pub const STATUS_CANCELLING: &str = "Cancelling...";

/// Status shown after a successful sign-in.
pub const STATUS_SUCCESS: &str = "Signed in successfully.";

/// Status shown after a cancelled sign-in.
pub const STATUS_CANCELLED: &str = "Sign-in cancelled.";

/// Status shown after a failed sign-in.
pub const STATUS_FAILED: &str = "Sign-in failed. Please try again.";

/// Enablement of the dialog's two buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonState {
    /// Whether Login can be pressed.
    pub login_enabled: bool,
    /// Whether Cancel can be pressed.
    pub cancel_enabled: bool,
}

impl ButtonState {
    /// Buttons before a run or after it finished.
    pub const IDLE: Self = Self {
        login_enabled: true,
        cancel_enabled: false,
    };

    /// Buttons while a run is in flight.
    pub const RUNNING: Self = Self {
        login_enabled: false,
        cancel_enabled: true,
    };

    /// Buttons after cancel was requested.
    pub const CANCELLING: Self = Self {
        login_enabled: false,
        cancel_enabled: false,
    };
}

/// Notification sent from a controller to its observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Controller state transitioned.
    StateChanged(OperationState),
    /// Status line text changed.
    StatusChanged(String),
    /// Progress estimate changed, in percent (0-100).
    ProgressChanged(u8),
    /// Button enablement changed.
    ButtonsChanged(ButtonState),
    /// The dialog should close after a terminal outcome.
    CloseRequested(OperationOutcome),
}

/// Returns the terminal status text for an outcome.
pub fn status_for_outcome(outcome: OperationOutcome) -> &'static str {
    match outcome {
        OperationOutcome::Success => STATUS_SUCCESS,
        OperationOutcome::Cancelled => STATUS_CANCELLED,
        OperationOutcome::Failed => STATUS_FAILED,
    }
}

/// Returns `true` when the dialog closes after `outcome`.
///
/// A failed sign-in keeps the dialog open so the user can press Login again.
pub fn closes_dialog(outcome: OperationOutcome) -> bool {
    !matches!(outcome, OperationOutcome::Failed)
}

/// Aggregate dialog state rebuilt from controller events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogState {
    /// Current status line.
    pub status: String,
    /// Current progress percentage.
    pub progress: u8,
    /// Current button enablement.
    pub buttons: ButtonState,
    /// Last reported controller state.
    pub operation: OperationState,
    /// Outcome that requested the dialog to close, if any.
    pub close_requested: Option<OperationOutcome>,
}

impl DialogState {
    /// Creates the initial dialog state.
    pub fn new() -> Self {
        Self {
            status: STATUS_READY.to_string(),
            progress: 0,
            buttons: ButtonState::IDLE,
            operation: OperationState::Idle,
            close_requested: None,
        }
    }

    /// Applies one controller event.
    pub fn apply(&mut self, event: &ControllerEvent) {
        match event {
            ControllerEvent::StateChanged(state) => {
                if state.is_running() {
                    self.close_requested = None;
                }
                self.operation = *state;
            }
            ControllerEvent::StatusChanged(status) => self.status.clone_from(status),
            ControllerEvent::ProgressChanged(progress) => self.progress = (*progress).min(100),
            ControllerEvent::ButtonsChanged(buttons) => self.buttons = *buttons,
            ControllerEvent::CloseRequested(outcome) => self.close_requested = Some(*outcome),
        }
    }

    /// Returns `true` once the controller asked the dialog to close.
    pub fn should_close(&self) -> bool {
        self.close_requested.is_some()
    }
}

impl Default for DialogState {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders a fixed-width text progress bar such as `[#####-----]  50%`.
pub fn render_progress_bar(progress: u8, width: usize) -> String {
    let progress = progress.min(100) as usize;
    let filled = width * progress / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        progress
    )
}
