#![warn(missing_docs)]
//! # login-sim-app binary
//!
//! Console rendition of the sign-in dialog: one status line with a text
//! progress bar, driven from stdin.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use login_sim_app::{OperationController, app_version, load_config};
use login_sim_auth::SharedSession;
use login_sim_core::OperationOutcome;
use login_sim_ui::{DialogState, render_progress_bar};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

const PROGRESS_BAR_WIDTH: usize = 30;

/// Commands typed by the user, one per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Login,
    Cancel,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "l" | "login" => Some(Self::Login),
            "c" | "cancel" => Some(Self::Cancel),
            "q" | "quit" => Some(Self::Quit),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config().context("failed to load configuration")?;
    info!(
        version = app_version(),
        min_delay_ms = config.min_delay_ms,
        max_delay_ms = config.max_delay_ms,
        "login-sim starting"
    );

    let session = SharedSession::new();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let controller = OperationController::simulated(config, event_tx, Arc::new(session.clone()))
        .context("failed to create controller")?;

    println!("login-sim {}", app_version());
    println!("Commands: l = login, c = cancel, q = quit");

    let total = controller.start().context("failed to start sign-in")?;
    info!(total_ms = total.as_millis() as u64, "sign-in scheduled");

    let mut dialog = DialogState::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                dialog.apply(&event);
                render(&dialog);
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match Command::parse(&line) {
                    Some(Command::Login) => {
                        if let Err(error) = controller.start() {
                            warn!(%error, "login ignored");
                        }
                    }
                    Some(Command::Cancel) => {
                        controller.cancel();
                    }
                    Some(Command::Quit) => break,
                    None => {}
                },
                Ok(None) => stdin_open = false,
                Err(error) => {
                    warn!(%error, "stdin unavailable; cancel and retry disabled");
                    stdin_open = false;
                }
            },
        }

        if should_exit(&dialog, stdin_open) {
            break;
        }
    }

    println!();
    controller.dispose();
    if controller.state().is_running() {
        controller.wait().await;
    }

    let outcome = controller.state().outcome();
    info!(
        outcome = outcome.map(OperationOutcome::as_str).unwrap_or("none"),
        logged_in = session.is_logged_in(),
        "login-sim exiting"
    );
    println!("logged_in={}", session.is_logged_in());
    Ok(())
}

/// Close requests always end the shell; a failed run only ends it once stdin
/// can no longer deliver a retry.
fn should_exit(dialog: &DialogState, stdin_open: bool) -> bool {
    dialog.should_close()
        || (!stdin_open && dialog.operation.outcome() == Some(OperationOutcome::Failed))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn render(dialog: &DialogState) {
    let mut stdout = std::io::stdout().lock();
    let _ = write!(
        stdout,
        "\r{} {:<40}",
        render_progress_bar(dialog.progress, PROGRESS_BAR_WIDTH),
        dialog.status
    );
    let _ = stdout.flush();
}
