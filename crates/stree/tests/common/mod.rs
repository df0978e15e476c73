//! Shared fixtures for engine integration tests.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stree_core::{SessionId, SessionNode, SessionTree};
use stree_engine::{ConfigResolver, EngineError, Host, TreeStore, Tools};
use stree_tmux::{Tmux, TmuxError};
use tempfile::TempDir;

// ============================================================================
// Recording Tmux
// ============================================================================

/// One call made against the fake tmux server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TmuxCall {
    NewWindow { name: String, dir: PathBuf },
    SendKeys { target: String, keys: String },
    KillWindow(String),
    DisplayMessage { target: String, message: String },
    SelectWindow(String),
}

/// In-memory tmux that records every call.
#[derive(Debug, Default)]
pub struct RecordingTmux {
    in_session: bool,
    window: Mutex<Option<String>>,
    calls: Mutex<Vec<TmuxCall>>,
    failing_windows: Mutex<Vec<String>>,
    fail_new_window: bool,
    windows_created: AtomicU32,
}

impl RecordingTmux {
    /// Inside tmux, sitting in `window`.
    pub fn in_window(window: &str) -> Self {
        Self {
            in_session: true,
            window: Mutex::new(Some(window.to_string())),
            ..Self::default()
        }
    }

    /// Outside tmux entirely.
    pub fn outside() -> Self {
        Self::default()
    }

    /// Inside tmux, but window creation always fails.
    pub fn broken(window: &str) -> Self {
        Self {
            fail_new_window: true,
            ..Self::in_window(window)
        }
    }

    pub fn set_window(&self, window: &str) {
        *self.window.lock().unwrap() = Some(window.to_string());
    }

    /// Makes every call targeting `window` (a name or an `@N` id) fail.
    pub fn fail_target(&self, window: &str) {
        self.failing_windows.lock().unwrap().push(window.to_string());
    }

    pub fn calls(&self) -> Vec<TmuxCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn killed_windows(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TmuxCall::KillWindow(w) => Some(w),
                _ => None,
            })
            .collect()
    }

    pub fn sent_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TmuxCall::SendKeys { keys, .. } => Some(keys),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: TmuxCall, target: &str) -> Result<(), TmuxError> {
        self.calls.lock().unwrap().push(call);
        if self.failing_windows.lock().unwrap().iter().any(|w| w == target) {
            return Err(TmuxError::CommandFailed(format!("can't find window: {target}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Tmux for RecordingTmux {
    fn in_session(&self) -> bool {
        self.in_session
    }

    async fn current_window(&self) -> Option<String> {
        if !self.in_session {
            return None;
        }
        self.window.lock().unwrap().clone()
    }

    /// Windows get ids `@1`, `@2`, ... in creation order.
    async fn new_window(&self, name: &str, dir: &Path) -> Result<String, TmuxError> {
        if self.fail_new_window {
            return Err(TmuxError::CommandFailed("no server running".to_string()));
        }
        self.record(
            TmuxCall::NewWindow {
                name: name.to_string(),
                dir: dir.to_path_buf(),
            },
            name,
        )?;
        let n = self.windows_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("@{n}"))
    }

    async fn send_keys(&self, target: &str, keys: &str) -> Result<(), TmuxError> {
        self.record(
            TmuxCall::SendKeys {
                target: target.to_string(),
                keys: keys.to_string(),
            },
            target,
        )
    }

    async fn kill_window(&self, target: &str) -> Result<(), TmuxError> {
        self.record(TmuxCall::KillWindow(target.to_string()), target)
    }

    async fn display_message(&self, target: &str, message: &str) -> Result<(), TmuxError> {
        self.record(
            TmuxCall::DisplayMessage {
                target: target.to_string(),
                message: message.to_string(),
            },
            target,
        )
    }

    async fn select_window(&self, target: &str) -> Result<(), TmuxError> {
        self.record(TmuxCall::SelectWindow(target.to_string()), target)
    }
}

// ============================================================================
// Fixture
// ============================================================================

/// Isolated config, state file and project directory.
pub struct Fixture {
    pub tools: Tools,
    pub tmux: Arc<RecordingTmux>,
    pub project: PathBuf,
    pub state_file: PathBuf,
    _temp_dir: TempDir, // Keep alive for RAII cleanup
}

impl Fixture {
    /// Builds a fixture whose user config is the state override plus `extra_yaml`.
    pub fn new(tmux: RecordingTmux, extra_yaml: &str) -> Self {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let project = temp_dir.path().join("shop");
        fs::create_dir_all(&project).unwrap();

        let state_file = temp_dir.path().join("state").join("sessions.json");
        let config_path = temp_dir.path().join("config").join("stree.yml");
        fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        fs::write(
            &config_path,
            format!(
                "tracking:\n  state_file: {}\n{extra_yaml}",
                state_file.display()
            ),
        )
        .unwrap();

        let tmux = Arc::new(tmux);
        let host = Host::new(tmux.clone(), project.clone());
        let tools = Tools::new(ConfigResolver::new(config_path), host);

        Self {
            tools,
            tmux,
            project,
            state_file,
            _temp_dir: temp_dir,
        }
    }

    /// Default settings apart from the state file.
    pub fn with_tmux(tmux: RecordingTmux) -> Self {
        Self::new(tmux, "")
    }

    pub fn store(&self) -> TreeStore {
        TreeStore::new(self.state_file.clone(), "main")
    }

    pub fn tree(&self) -> SessionTree {
        self.store().load()
    }

    /// Registers a session whose window is `name`, under `parent` if given.
    pub fn track(&self, id: &str, name: &str, parent: Option<&str>) -> SessionId {
        let id = SessionId::new(id);
        let mut node = SessionNode::new(id.clone(), name, self.project.join(name));
        node.parent = parent.map(SessionId::new);
        fs::create_dir_all(&node.working_dir).unwrap();
        self.store()
            .update(|tree| tree.insert(node).map_err(EngineError::from))
            .unwrap();
        id
    }

    pub fn node(&self, id: &SessionId) -> SessionNode {
        self.tree().get(id).cloned().expect("node tracked")
    }
}
