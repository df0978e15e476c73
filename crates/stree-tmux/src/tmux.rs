//! Tmux integration.
//!
//! Provides the `Tmux` trait used by the engine for:
//! - Detecting whether we run inside tmux and which window we are in
//! - Creating, killing and focusing windows
//! - Typing a command into a window
//! - Flashing a message on another window's status line
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Tmux command failures are returned as errors

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, trace};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during tmux operations.
#[derive(Debug, Error)]
pub enum TmuxError {
    /// Not running inside tmux
    #[error("not running inside tmux")]
    NotInTmux,

    /// Failed to execute tmux command
    #[error("tmux command failed: {0}")]
    CommandFailed(String),

    /// Empty window target
    #[error("invalid window target: {0:?}")]
    InvalidTarget(String),
}

// ============================================================================
// Tmux Trait
// ============================================================================

/// Operations on the ambient tmux server.
///
/// Windows are addressed by name. Implementations must not panic; every
/// failure is reported as a `TmuxError`.
#[async_trait]
pub trait Tmux: Send + Sync {
    /// Returns true if the current process runs inside a tmux session.
    fn in_session(&self) -> bool;

    /// Returns the name of the window this process runs in.
    ///
    /// `None` when not in tmux or the query fails.
    async fn current_window(&self) -> Option<String>;

    /// Creates a window named `name` whose shell starts in `dir`.
    ///
    /// Returns the tmux window id (`@N`), which stays unambiguous even
    /// when several windows share a name.
    async fn new_window(&self, name: &str, dir: &Path) -> Result<String, TmuxError>;

    /// Types `keys` literally into `target`, then presses Enter.
    async fn send_keys(&self, target: &str, keys: &str) -> Result<(), TmuxError>;

    /// Kills the window `target`.
    async fn kill_window(&self, target: &str) -> Result<(), TmuxError>;

    /// Shows `message` on the status line of the client viewing `target`.
    async fn display_message(&self, target: &str, message: &str) -> Result<(), TmuxError>;

    /// Switches focus to the window `target`.
    async fn select_window(&self, target: &str) -> Result<(), TmuxError>;
}

/// Checks if we're running inside a tmux session.
///
/// Returns `true` if the `TMUX` environment variable is set.
#[must_use]
pub fn is_in_tmux() -> bool {
    std::env::var_os("TMUX").is_some()
}

// ============================================================================
// Tmux CLI Implementation
// ============================================================================

/// `Tmux` implementation that runs the `tmux` binary.
#[derive(Debug, Clone)]
pub struct TmuxCli {
    program: String,
}

impl Default for TmuxCli {
    fn default() -> Self {
        Self::new()
    }
}

impl TmuxCli {
    pub fn new() -> Self {
        Self {
            program: "tmux".to_string(),
        }
    }

    /// Uses a different tmux binary (or wrapper script).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs tmux with `args` and returns its stdout.
    async fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        trace!(?args, "Running tmux");

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| TmuxError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let subcommand = args.first().copied().unwrap_or("tmux");
            return Err(TmuxError::CommandFailed(format!(
                "{subcommand} failed: {}",
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn check_target(target: &str) -> Result<(), TmuxError> {
    if target.is_empty() {
        return Err(TmuxError::InvalidTarget(target.to_string()));
    }
    Ok(())
}

#[async_trait]
impl Tmux for TmuxCli {
    fn in_session(&self) -> bool {
        is_in_tmux()
    }

    async fn current_window(&self) -> Option<String> {
        if !self.in_session() {
            return None;
        }
        match self.run(&["display-message", "-p", "#W"]).await {
            Ok(out) => {
                let name = out.trim();
                (!name.is_empty()).then(|| name.to_string())
            }
            Err(e) => {
                debug!(error = %e, "Could not read current tmux window");
                None
            }
        }
    }

    async fn new_window(&self, name: &str, dir: &Path) -> Result<String, TmuxError> {
        if !self.in_session() {
            return Err(TmuxError::NotInTmux);
        }
        check_target(name)?;
        let dir = dir.to_string_lossy();
        let out = self
            .run(&["new-window", "-P", "-F", "#{window_id}", "-n", name, "-c", &*dir])
            .await?;
        let window_id = out.trim();
        if window_id.is_empty() {
            return Err(TmuxError::CommandFailed(
                "new-window printed no window id".to_string(),
            ));
        }
        Ok(window_id.to_string())
    }

    async fn send_keys(&self, target: &str, keys: &str) -> Result<(), TmuxError> {
        check_target(target)?;
        // -l types the text verbatim; Enter is sent separately as a key name
        self.run(&["send-keys", "-t", target, "-l", keys]).await?;
        self.run(&["send-keys", "-t", target, "Enter"]).await?;
        Ok(())
    }

    async fn kill_window(&self, target: &str) -> Result<(), TmuxError> {
        check_target(target)?;
        self.run(&["kill-window", "-t", target]).await?;
        Ok(())
    }

    async fn display_message(&self, target: &str, message: &str) -> Result<(), TmuxError> {
        check_target(target)?;
        self.run(&["display-message", "-t", target, message]).await?;
        Ok(())
    }

    async fn select_window(&self, target: &str) -> Result<(), TmuxError> {
        if !self.in_session() {
            return Err(TmuxError::NotInTmux);
        }
        check_target(target)?;
        self.run(&["select-window", "-t", target]).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
