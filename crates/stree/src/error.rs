//! Error types for the orchestration engine.
//!
//! Every public operation of the `Tools` facade converts these errors into
//! a failed result carrying the error's display text, so the messages here
//! are what the host agent ends up showing.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.

use std::io;
use std::path::PathBuf;

use stree_core::{DomainError, SpawnMode};
use stree_tmux::TmuxError;
use thiserror::Error;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Errors from resolving configuration.
///
/// A broken user override never produces one of these; it is logged and
/// the defaults are used instead.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration compiled into the binary does not parse.
    #[error("Bundled default configuration is invalid: {0}")]
    InvalidDefault(#[source] serde_yaml::Error),
}

// ============================================================================
// Store Errors
// ============================================================================

/// Errors from persisting the session tree.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure on the state file or its directory.
    #[error("State file I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to take the state lock.
    #[error("Failed to lock {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The tree could not be serialized.
    #[error("Failed to serialize session tree: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ============================================================================
// Engine Errors
// ============================================================================

/// Errors from engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// spawn_mode is tmux but the caller is not inside tmux.
    #[error("Not running in tmux. spawn_mode 'tmux' requires running inside a tmux session.")]
    TmuxRequired,

    /// A tmux-only operation was requested outside tmux.
    #[error("Not running in tmux")]
    NotInTmux,

    /// The requested agent type is not configured.
    #[error("Unknown agent type: {agent_type}. Available: {available}")]
    UnknownAgentType {
        agent_type: String,
        /// Comma-separated list of configured agent types.
        available: String,
    },

    /// The backend could not create the execution surface.
    #[error("Failed to create {mode} window")]
    Backend { mode: SpawnMode },

    /// No tracked session matches the given name or window.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The caller is untracked or is a root session.
    #[error("No parent window found")]
    NoParent,

    /// The caller's parent id does not resolve to a usable node.
    #[error("Parent window not found in tree")]
    ParentNotInTree,

    /// interaction.auto_focus_parent is false.
    #[error("auto_focus_parent is disabled in config")]
    FocusDisabled,

    /// tmux refused to select the parent window.
    #[error("Failed to switch to parent: {0}")]
    Focus(#[source] TmuxError),

    /// Report names must be a plain file stem.
    #[error("Invalid report name: {0:?}")]
    InvalidReportName(String),

    /// Writing a report failed.
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

// ============================================================================
// Tests
// ============================================================================
