//! Spawn engine: creating a child session and registering it in the tree.
//!
//! # Flow
//!
//! ```text
//! validate mode + agent ─▶ find caller in tree ─▶ name window, render prompt
//!                                                          │
//!                 save node under caller ◀─ backend creates surface
//! ```
//!
//! The tree is only written once the surface exists, so a failed launch
//! leaves no trace in the state file. Window names are unique among live
//! sessions: a second `web-lead` becomes `web-lead-2`.

use std::path::{Path, PathBuf};

use chrono::Local;
use stree_core::{window_name, PromptVars, SessionId, SessionNode, SpawnMode};
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::host::{caller_node, join_relative, Host, ROOT_SENTINEL};
use crate::store::TreeStore;

/// Event name checked in `events:` before logging a spawn.
pub const SESSION_CREATED_EVENT: &str = "session_created";

/// What to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub agent_type: String,
    pub task_description: String,
    /// Overrides the agent's default directory.
    pub working_dir: Option<PathBuf>,
}

impl SpawnRequest {
    pub fn new(agent_type: impl Into<String>, task_description: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            task_description: task_description.into(),
            working_dir: None,
        }
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// A successfully spawned session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spawned {
    pub session_id: SessionId,
    pub window: String,
    pub agent_type: String,
    pub parent: Option<SessionId>,
    pub working_dir: PathBuf,
}

/// Spawns a child session of the caller.
///
/// # Errors
///
/// * `EngineError::TmuxRequired` - tmux mode outside tmux (nothing touched)
/// * `EngineError::UnknownAgentType` - lists every configured type
/// * `EngineError::Backend` - the surface could not be created
/// * `EngineError::Domain` / `EngineError::Store` - registration failed
pub async fn spawn(host: &Host, config: &Config, store: &TreeStore, request: SpawnRequest) -> Result<Spawned> {
    if config.spawn_mode == SpawnMode::Tmux && !host.tmux().in_session() {
        return Err(EngineError::TmuxRequired);
    }

    let agent = config
        .agents
        .get(&request.agent_type)
        .ok_or_else(|| EngineError::UnknownAgentType {
            agent_type: request.agent_type.clone(),
            available: config.agent_type_list(),
        })?;

    let tree = store.load();
    let current_window = host.current_window().await;
    let caller = caller_node(&tree, current_window.as_deref());
    let parent_id = caller.map(|n| n.id.clone());
    let parent_name = caller
        .map(|n| n.window_handle().to_string())
        .unwrap_or_else(|| ROOT_SENTINEL.to_string());
    debug!(
        window = current_window.as_deref().unwrap_or("-"),
        parent = %parent_name,
        tracked = caller.is_some(),
        "Resolved spawning session"
    );

    let working_dir = match &request.working_dir {
        Some(dir) => host.cwd().join(dir),
        None => join_relative(host.cwd(), Path::new(&agent.default_dir)),
    };

    let session_id = SessionId::generate();
    let window = tree.unique_window(&window_name(
        &config.tmux.window_pattern,
        &request.agent_type,
        &parent_name,
    ));

    let prompt = PromptVars::new(
        &request.agent_type,
        host.project_name(),
        parent_name.as_str(),
        Local::now().date_naive(),
        &request.task_description,
    )
    .render(&config.templates.agent_prompt);
    let command = config.host.startup_command(&prompt);

    let backend = Backend::select(config, host.tmux());
    let surface = backend
        .create_session(&window, &working_dir, Some(&command))
        .await
        .ok_or(EngineError::Backend {
            mode: backend.mode(),
        })?;

    let mut node = SessionNode::new(session_id.clone(), window.clone(), working_dir.clone());
    node.agent_type = Some(request.agent_type.clone());
    node.task_description = Some(request.task_description);
    node.spawn_mode = Some(surface.mode);
    node.window_id = surface.window_id;
    node.pid = surface.pid;
    node.pid_started_at = surface.pid_started_at;

    let parent = store.update(|tree| {
        if tree.window_in_use(&window) {
            warn!(window = %window, "Window name taken by a concurrent spawn");
        }
        if let Some(parent_id) = &parent_id {
            if tree.get(parent_id).is_some() {
                node.parent = Some(parent_id.clone());
            } else {
                warn!(parent = %parent_id, "Spawning session vanished from the tree, registering as root");
            }
        }
        let parent = node.parent.clone();
        tree.insert(node)?;
        Ok::<_, EngineError>(parent)
    })?;

    if config.logs_event(SESSION_CREATED_EVENT) {
        info!(
            session_id = %session_id,
            agent_type = %request.agent_type,
            parent = parent.as_ref().map_or(ROOT_SENTINEL, |p| p.as_str()),
            window = %window,
            mode = %surface.mode,
            "Agent session spawned"
        );
    }

    Ok(Spawned {
        session_id,
        window,
        agent_type: request.agent_type,
        parent,
        working_dir,
    })
}
