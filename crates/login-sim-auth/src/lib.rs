#![warn(missing_docs)]
//! # login-sim-auth
//!
//! ## Purpose
//! Tracks whether the user is signed in once the simulated sign-in succeeds.
//!
//! ## Responsibilities
//! - Model the signed-in flag as explicit session transitions.
//! - Expose [`PostSuccessAction`], the hook a controller runs after a
//!   successful sign-in.
//! - Provide [`SharedSession`], a thread-safe session usable as that hook.
//!
//! ## Data flow
//! Controller observes `Success` -> calls [`PostSuccessAction::on_success`] ->
//! [`SharedSession`] applies [`LoginSession::on_login_success`].
//!
//! ## Error model
//! The only failure is a poisoned session lock, surfaced as
//! [`SessionError::LockPoisoned`] so the caller can log it.
//!
//! ## Security and privacy notes
//! No credentials or tokens exist in this workspace; the session holds only a
//! timestamp and a counter.
//!
//! ## Example
//! ```rust
//! use login_sim_auth::{LoginSession, SessionState};
//!
//! let mut session = LoginSession::new();
//! assert!(matches!(session.state(), SessionState::LoggedOut));
//! session.on_login_success(1_000);
//! assert!(session.is_logged_in());
//! ```

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Signed-in state of the local user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No successful sign-in yet, or the user signed out.
    LoggedOut,
    /// A sign-in succeeded.
    LoggedIn {
        /// Epoch milliseconds of the latest successful sign-in.
        since_ms: u64,
    },
}

/// Session state machine with explicit legal transitions.
#[derive(Debug, Clone)]
pub struct LoginSession {
    state: SessionState,
    sign_ins: u64,
}

impl LoginSession {
    /// Creates a session in `LoggedOut` state.
    pub fn new() -> Self {
        Self {
            state: SessionState::LoggedOut,
            sign_ins: 0,
        }
    }

    /// Returns current session state snapshot.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Applies a successful sign-in at `now_ms`.
    pub fn on_login_success(&mut self, now_ms: u64) {
        self.state = SessionState::LoggedIn { since_ms: now_ms };
        self.sign_ins = self.sign_ins.saturating_add(1);
    }

    /// Explicit sign-out transition.
    pub fn logout(&mut self) {
        self.state = SessionState::LoggedOut;
    }

    /// Returns `true` while signed in.
    pub fn is_logged_in(&self) -> bool {
        matches!(self.state, SessionState::LoggedIn { .. })
    }

    /// Number of successful sign-ins applied to this session.
    pub fn sign_in_count(&self) -> u64 {
        self.sign_ins
    }
}

impl Default for LoginSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Hook run exactly once per successful operation.
pub trait PostSuccessAction: Send + Sync {
    /// Called after the controller recorded a `Success` outcome.
    ///
    /// # Errors
    /// Implementations report their own bookkeeping failures; the controller
    /// logs them and never converts them into a second outcome.
    fn on_success(&self) -> Result<(), SessionError>;
}

/// No-op hook for controllers without a session.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPostSuccessAction;

impl PostSuccessAction for NoPostSuccessAction {
    fn on_success(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Thread-safe session handle shared between controller and shell.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<LoginSession>>,
}

impl SharedSession {
    /// Creates a logged-out shared session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current session.
    ///
    /// # Errors
    /// Returns [`SessionError::LockPoisoned`] when a writer panicked.
    pub fn snapshot(&self) -> Result<LoginSession, SessionError> {
        self.inner
            .lock()
            .map(|session| session.clone())
            .map_err(|_| SessionError::LockPoisoned)
    }

    /// Returns `true` while signed in; a poisoned lock reads as logged out.
    pub fn is_logged_in(&self) -> bool {
        self.snapshot()
            .map(|session| session.is_logged_in())
            .unwrap_or(false)
    }

    /// Signs the user out.
    ///
    /// # Errors
    /// Returns [`SessionError::LockPoisoned`] when a writer panicked.
    pub fn logout(&self) -> Result<(), SessionError> {
        let mut session = self.inner.lock().map_err(|_| SessionError::LockPoisoned)?;
        session.logout();
        Ok(())
    }
}

impl PostSuccessAction for SharedSession {
    fn on_success(&self) -> Result<(), SessionError> {
        let mut session = self.inner.lock().map_err(|_| SessionError::LockPoisoned)?;
        session.on_login_success(now_ms());
        tracing::info!(sign_ins = session.sign_in_count(), "session marked logged in");
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Errors produced by session bookkeeping.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A thread panicked while holding the session lock.
    #[error("session lock poisoned")]
    LockPoisoned,
}
