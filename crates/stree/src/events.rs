//! Host event handling.

use stree_core::{SessionId, SessionStatus};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::host::{caller_node, Host};
use crate::store::TreeStore;

/// Event name checked in `events:` before logging an idle transition.
pub const SESSION_IDLE_EVENT: &str = "session_idle";

/// Marks the caller's node `idle` after the host reports the session idle.
///
/// Returns the marked node's id, or `None` when the caller is not a
/// tracked session (nothing is written in that case).
pub async fn mark_idle(host: &Host, config: &Config, store: &TreeStore) -> Result<Option<SessionId>> {
    let Some(window) = host.current_window().await else {
        debug!("Idle event outside tmux, ignoring");
        return Ok(None);
    };

    if caller_node(&store.load(), Some(&window)).is_none() {
        debug!(window = %window, "Idle event from untracked window");
        return Ok(None);
    }

    let marked = store.update(|tree| {
        let Some(id) = caller_node(tree, Some(&window)).map(|n| n.id.clone()) else {
            return Ok(None);
        };
        tree.set_status(&id, SessionStatus::Idle)?;
        Ok::<_, EngineError>(Some(id))
    })?;

    if let Some(id) = &marked {
        if config.logs_event(SESSION_IDLE_EVENT) {
            info!(session_id = %id, window = %window, "Session idle");
        }
    }
    Ok(marked)
}
