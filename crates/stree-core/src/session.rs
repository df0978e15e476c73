//! Session domain entities and value objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Unique identifier for a tracked session.
///
/// Generated ids look like `session-1718000000000-k3j9x0a1b`: a millisecond
/// timestamp followed by a random suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

/// Prefix shared by every generated session id.
pub const SESSION_ID_PREFIX: &str = "session-";

/// Length of the random suffix of a generated id.
const SUFFIX_LEN: usize = 9;

impl SessionId {
    /// Creates a SessionId from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh id from the current time plus a random suffix.
    ///
    /// Collisions need two spawns in the same millisecond drawing the same
    /// nine hex digits from a v4 UUID.
    #[must_use]
    pub fn generate() -> Self {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(SUFFIX_LEN)
            .collect();
        Self(format!(
            "{SESSION_ID_PREFIX}{}-{suffix}",
            Utc::now().timestamp_millis()
        ))
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Session Status
// ============================================================================

/// Lifecycle status of a tracked session.
///
/// In practice sessions move `active → idle → killed` or
/// `active → completed`, but the tree does not enforce an order.
/// `Killed` is a soft delete: the node stays in the tree for history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// The agent is working.
    #[default]
    Active,
    /// The host reported the agent went idle.
    Idle,
    /// The agent finished its task.
    Completed,
    /// The session was terminated through a kill.
    Killed,
}

impl SessionStatus {
    /// Returns the display label for this status.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Completed => "completed",
            Self::Killed => "killed",
        }
    }

    /// Returns the glyph shown in the tree view.
    ///
    /// Completed and killed sessions share the same glyph.
    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Active => "🟢",
            Self::Idle => "🟡",
            Self::Completed | Self::Killed => "⚪",
        }
    }

    /// Returns true if the session has not been killed or completed.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Active | Self::Idle)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Spawn Mode
// ============================================================================

/// Backend strategy used to create a session's execution surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnMode {
    /// A new window inside the ambient tmux session.
    #[default]
    #[serde(alias = "multiplexer")]
    Tmux,
    /// A detached external terminal process.
    Terminal,
}

impl fmt::Display for SpawnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tmux => write!(f, "tmux"),
            Self::Terminal => write!(f, "terminal"),
        }
    }
}

// ============================================================================
// Session Node
// ============================================================================

/// One tracked session in the tree.
///
/// `tmux_window` is the handle joining "what is running" with "what is
/// tracked"; for terminal spawns it holds the synthesized window title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionNode {
    pub id: SessionId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
    pub working_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmux_window: Option<String>,
    /// Child ids in spawn order.
    #[serde(default)]
    pub children: Vec<SessionId>,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_mode: Option<SpawnMode>,
    /// tmux window id (`@N`) for tmux spawns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<String>,
    /// PID of the terminal launcher for terminal spawns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Start time of `pid`, in seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid_started_at: Option<u64>,
}

impl SessionNode {
    /// Creates an active node with no children, stamped with the current time.
    pub fn new(id: SessionId, name: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        let name = name.into();
        Self {
            id,
            tmux_window: Some(name.clone()),
            name,
            parent: None,
            agent_type: None,
            working_dir: working_dir.into(),
            task_description: None,
            created_at: Utc::now(),
            children: Vec::new(),
            status: SessionStatus::Active,
            spawn_mode: None,
            window_id: None,
            pid: None,
            pid_started_at: None,
        }
    }

    /// Returns the handle used to address the execution surface.
    ///
    /// Falls back to the node name when no window was recorded.
    #[must_use]
    pub fn window_handle(&self) -> &str {
        self.tmux_window.as_deref().unwrap_or(&self.name)
    }

    /// Returns true if the node has no parent.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
