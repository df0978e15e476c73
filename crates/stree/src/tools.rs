//! Operations exposed to the host agent runtime.
//!
//! `Tools` is the outer boundary of the engine: configuration is resolved
//! fresh for every call, and every failure comes back as a result with
//! `success == false` and a display message. Nothing here returns `Err`.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Engine errors are converted to messages with `to_string()`

use std::fmt::Write as _;
use std::path::PathBuf;

use stree_core::render_tree;
use tracing::warn;

use crate::config::{Config, ConfigResolver};
use crate::error::{EngineError, Result};
use crate::events::mark_idle;
use crate::host::Host;
use crate::kill::kill_session;
use crate::notify::{focus_parent, report_to_parent};
use crate::spawn::{spawn, SpawnRequest};
use crate::store::TreeStore;

// ============================================================================
// Results
// ============================================================================

/// Plain success flag plus display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub success: bool,
    pub message: String,
}

impl ToolResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn failed(err: &EngineError) -> Self {
        warn!(error = %err, "Operation failed");
        Self {
            success: false,
            message: err.to_string(),
        }
    }
}

/// Result of `spawn_child`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnResult {
    pub success: bool,
    pub session_id: Option<String>,
    pub message: String,
}

/// Result of `report_to_parent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportResult {
    pub success: bool,
    pub message: String,
    /// Window (or name) of the notified parent.
    pub parent_handle: Option<String>,
}

// ============================================================================
// Facade
// ============================================================================

/// Entry point for the host runtime's tool calls.
#[derive(Debug, Clone)]
pub struct Tools {
    resolver: ConfigResolver,
    host: Host,
}

impl Tools {
    pub fn new(resolver: ConfigResolver, host: Host) -> Self {
        Self { resolver, host }
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Resolves a configuration snapshot and the store it points at.
    fn snapshot(&self) -> Result<(Config, TreeStore)> {
        let config = self.resolver.resolve()?;
        let store = TreeStore::from_config(&config);
        Ok((config, store))
    }

    /// Spawns a child of the calling session.
    pub async fn spawn_child(
        &self,
        agent_type: &str,
        task_description: &str,
        working_dir: Option<PathBuf>,
    ) -> SpawnResult {
        let outcome = async {
            let (config, store) = self.snapshot()?;
            let mut request = SpawnRequest::new(agent_type, task_description);
            if let Some(dir) = working_dir {
                request = request.with_working_dir(dir);
            }
            spawn(&self.host, &config, &store, request).await
        }
        .await;

        match outcome {
            Ok(spawned) => SpawnResult {
                success: true,
                session_id: Some(spawned.session_id.to_string()),
                message: format!(
                    "Spawned {} agent in window: {}",
                    spawned.agent_type, spawned.window
                ),
            },
            Err(e) => {
                let failed = ToolResult::failed(&e);
                SpawnResult {
                    success: false,
                    session_id: None,
                    message: failed.message,
                }
            }
        }
    }

    /// Renders the current session tree.
    pub fn show_tree(&self) -> ToolResult {
        match self.snapshot() {
            Ok((_, store)) => ToolResult::ok(render_tree(&store.load())),
            Err(e) => ToolResult::failed(&e),
        }
    }

    /// Kills a session by name or window, optionally with its descendants.
    pub async fn kill_session(&self, name: &str, kill_children: bool) -> ToolResult {
        let outcome = async {
            let (_, store) = self.snapshot()?;
            kill_session(&self.host, &store, name, kill_children).await
        }
        .await;

        match outcome {
            Ok(killed) => {
                let suffix = if killed.with_children { " (and children)" } else { "" };
                ToolResult::ok(format!("Killed session: {}{suffix}", killed.target))
            }
            Err(e) => ToolResult::failed(&e),
        }
    }

    /// Lists configured agent types with their descriptions.
    pub fn list_agent_types(&self) -> ToolResult {
        let config = match self.resolver.resolve() {
            Ok(config) => config,
            Err(e) => return ToolResult::failed(&e.into()),
        };

        let mut message = String::from("Available agent types:\n");
        for (name, agent) in &config.agents {
            let _ = write!(message, "\n- **{name}**: {}", agent.description);
        }
        ToolResult::ok(message)
    }

    /// Switches tmux focus to the caller's parent window.
    pub async fn focus_parent(&self) -> ToolResult {
        let outcome = async {
            let (config, store) = self.snapshot()?;
            focus_parent(&self.host, &config, &store).await
        }
        .await;

        match outcome {
            Ok(window) => ToolResult::ok(format!("Switched to parent window: {window}")),
            Err(e) => ToolResult::failed(&e),
        }
    }

    /// Writes a report for the caller's parent and notifies it.
    pub async fn report_to_parent(&self, content: &str, report_name: &str) -> ReportResult {
        let outcome = async {
            let (config, store) = self.snapshot()?;
            report_to_parent(&self.host, &config, &store, content, report_name).await
        }
        .await;

        match outcome {
            Ok(report) => ReportResult {
                success: true,
                message: format!(
                    "Report created at: {}\nNotified parent: {}",
                    report.path.display(),
                    report.parent_handle
                ),
                parent_handle: Some(report.parent_handle),
            },
            Err(e) => {
                let failed = ToolResult::failed(&e);
                ReportResult {
                    success: false,
                    message: failed.message,
                    parent_handle: None,
                }
            }
        }
    }

    /// Handles the host's session-idle event.
    pub async fn session_idle(&self) -> ToolResult {
        let outcome = async {
            let (config, store) = self.snapshot()?;
            mark_idle(&self.host, &config, &store).await
        }
        .await;

        match outcome {
            Ok(Some(id)) => ToolResult::ok(format!("Marked session idle: {id}")),
            Ok(None) => ToolResult::ok("No tracked session for this window"),
            Err(e) => ToolResult::failed(&e),
        }
    }
}
