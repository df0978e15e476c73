//! Backend adapter: creating and terminating execution surfaces.
//!
//! A surface is either a tmux window or a detached terminal process. The
//! variant is picked once per spawn from `spawn_mode`; termination follows
//! whatever variant the node was created with.

use std::path::Path;

use stree_core::{substitute, SessionNode, SpawnMode};
use stree_tmux::{spawn_detached, terminate, Tmux};
use tracing::{debug, warn};

use crate::config::{Config, TerminalConfig};

/// A freshly created execution surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub mode: SpawnMode,
    /// tmux window id, for tmux surfaces.
    pub window_id: Option<String>,
    /// PID of the terminal launcher, for terminal surfaces.
    pub pid: Option<u32>,
    /// Start time of `pid`, in seconds since the epoch.
    pub pid_started_at: Option<u64>,
}

/// The two ways of hosting a child session.
pub enum Backend<'a> {
    /// New window in the ambient tmux session.
    Tmux(&'a dyn Tmux),
    /// Detached external terminal built from a command template.
    Terminal(&'a TerminalConfig),
}

impl<'a> Backend<'a> {
    /// Picks the backend named by `config.spawn_mode`.
    pub fn select(config: &'a Config, tmux: &'a dyn Tmux) -> Self {
        match config.spawn_mode {
            SpawnMode::Tmux => Self::Tmux(tmux),
            SpawnMode::Terminal => Self::Terminal(&config.terminal),
        }
    }

    pub fn mode(&self) -> SpawnMode {
        match self {
            Self::Tmux(_) => SpawnMode::Tmux,
            Self::Terminal(_) => SpawnMode::Terminal,
        }
    }

    /// Creates a surface named `name` running in `dir`.
    ///
    /// With tmux, `command` is typed into the new window followed by Enter;
    /// keys are addressed by window id, never by name. With a terminal,
    /// `command` fills the `{command}` placeholder.
    ///
    /// Returns `None` on any failure; the cause is logged here. A window
    /// whose command could not be started is closed again.
    pub async fn create_session(&self, name: &str, dir: &Path, command: Option<&str>) -> Option<Surface> {
        match self {
            Self::Tmux(tmux) => {
                let window_id = match tmux.new_window(name, dir).await {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(window = name, error = %e, "Failed to create tmux window");
                        return None;
                    }
                };
                if let Some(command) = command {
                    if let Err(e) = tmux.send_keys(&window_id, command).await {
                        warn!(window = name, window_id = %window_id, error = %e, "Failed to start command in tmux window");
                        if let Err(e) = tmux.kill_window(&window_id).await {
                            warn!(window_id = %window_id, error = %e, "Failed to close abandoned tmux window");
                        }
                        return None;
                    }
                }
                Some(Surface {
                    mode: SpawnMode::Tmux,
                    window_id: Some(window_id),
                    pid: None,
                    pid_started_at: None,
                })
            }
            Self::Terminal(terminal) => {
                let dir_text = dir.to_string_lossy().into_owned();
                let vars = [
                    ("name", name),
                    ("dir", dir_text.as_str()),
                    ("command", command.unwrap_or_default()),
                ];
                let args: Vec<String> = terminal
                    .args
                    .iter()
                    .map(|arg| substitute(arg, &vars))
                    .collect();

                match spawn_detached(&terminal.command, &args, dir) {
                    Ok(launched) => Some(Surface {
                        mode: SpawnMode::Terminal,
                        window_id: None,
                        pid: Some(launched.pid),
                        pid_started_at: launched.started_at,
                    }),
                    Err(e) => {
                        warn!(terminal = %terminal.command, error = %e, "Failed to create terminal window");
                        None
                    }
                }
            }
        }
    }
}

/// Best-effort termination of the surface hosting `node`.
///
/// Returns true if a surface was terminated. Failures (typically: already
/// closed) are logged at debug level and otherwise ignored. Terminal
/// launchers are only signalled when their recorded start time still
/// matches; without one the node is left to be marked killed.
pub async fn terminate_surface(tmux: &dyn Tmux, node: &SessionNode) -> bool {
    match (node.spawn_mode, node.pid, node.pid_started_at) {
        (Some(SpawnMode::Terminal), Some(pid), Some(started_at)) => {
            match terminate(pid, started_at) {
                Ok(()) => true,
                Err(e) => {
                    debug!(session_id = %node.id, pid, error = %e, "Terminal already gone");
                    false
                }
            }
        }
        (Some(SpawnMode::Terminal), _, _) => {
            debug!(session_id = %node.id, "No verifiable PID recorded for terminal session");
            false
        }
        _ => {
            let Some(window) = node.window_id.as_deref().or(node.tmux_window.as_deref()) else {
                return false;
            };
            match tmux.kill_window(window).await {
                Ok(()) => true,
                Err(e) => {
                    debug!(session_id = %node.id, window, error = %e, "Window already closed");
                    false
                }
            }
        }
    }
}
