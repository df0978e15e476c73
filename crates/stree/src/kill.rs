//! Cascading kill.
//!
//! Killing is a soft delete: surfaces are terminated best-effort and the
//! nodes are marked `killed`, but nothing is removed from the tree.

use stree_core::{SessionId, SessionStatus};
use tracing::{debug, info};

use crate::backend::terminate_surface;
use crate::error::{EngineError, Result};
use crate::host::Host;
use crate::store::TreeStore;

/// Outcome of a kill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Killed {
    /// The name the caller asked for.
    pub target: String,
    /// Every node marked killed, in visiting order.
    pub killed: Vec<SessionId>,
    /// Nodes whose surface was actually terminated.
    pub terminated: usize,
    pub with_children: bool,
}

/// Kills the session named `target` (by name or window handle) and, if
/// `with_children` is set, all of its descendants.
///
/// Nodes are visited pre-order in child-list order. For each, the surface
/// is terminated best-effort and the status becomes `killed` whether or not
/// termination worked. The tree is saved once at the end.
///
/// The caller's own window, if it is part of the cascade, is closed only
/// after the tree has been saved: closing it first would end this process.
///
/// # Errors
///
/// * `EngineError::SessionNotFound` - no node matches `target`
/// * `EngineError::Store` - the tree could not be saved
pub async fn kill_session(host: &Host, store: &TreeStore, target: &str, with_children: bool) -> Result<Killed> {
    let tree = store.load();
    let node = tree
        .find_by_name_or_window(target)
        .ok_or_else(|| EngineError::SessionNotFound(target.to_string()))?;

    let order = tree.kill_order(&node.id, with_children);
    let current_window = host.current_window().await;

    let mut terminated = 0;
    let mut deferred = Vec::new();
    for id in &order {
        let Some(n) = tree.get(id) else {
            continue;
        };
        if current_window.is_some() && n.tmux_window == current_window {
            debug!(session_id = %id, "Deferring kill of the calling window");
            deferred.push(n);
            continue;
        }
        if terminate_surface(host.tmux(), n).await {
            terminated += 1;
        }
    }

    store.update(|tree| {
        for id in &order {
            if let Some(n) = tree.get_mut(id) {
                n.status = SessionStatus::Killed;
            }
        }
        Ok::<_, EngineError>(())
    })?;

    info!(session = target, killed = order.len(), terminated, with_children, "Killed sessions");

    for n in deferred {
        if terminate_surface(host.tmux(), n).await {
            terminated += 1;
        }
    }

    Ok(Killed {
        target: target.to_string(),
        killed: order,
        terminated,
        with_children,
    })
}
