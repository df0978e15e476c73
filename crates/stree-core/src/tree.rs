//! The session tree aggregate.
//!
//! Nodes live in a flat id → node table; parent/child links are ids into
//! that table. Insertion order of the table is preserved so that a tree
//! loaded and saved again serializes identically.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{DomainError, DomainResult, SessionId, SessionNode, SessionStatus};

/// Root id used when no configuration names one.
pub const DEFAULT_ROOT: &str = "main";

/// All tracked sessions plus the name of the root tmux session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTree {
    pub root: String,
    #[serde(default)]
    pub nodes: IndexMap<SessionId, SessionNode>,
}

impl Default for SessionTree {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

impl SessionTree {
    /// Creates an empty tree.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            nodes: IndexMap::new(),
        }
    }

    /// Total number of tracked nodes, killed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &SessionId) -> Option<&SessionNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut SessionNode> {
        self.nodes.get_mut(id)
    }

    /// Finds the live node whose window handle equals `window`.
    ///
    /// Killed and completed nodes keep their handle but are never matched,
    /// so a respawned window is not mistaken for its dead predecessor.
    /// Handles should be unique among live nodes; when they are not the
    /// match is ambiguous and a warning is logged.
    pub fn find_by_window(&self, window: &str) -> Option<&SessionNode> {
        let mut matches = self
            .nodes
            .values()
            .filter(|n| n.status.is_live() && n.tmux_window.as_deref() == Some(window));
        let first = matches.next()?;
        if matches.next().is_some() {
            warn!(window, "Window handle matches several tracked sessions, using the first");
        }
        Some(first)
    }

    /// Finds the node whose name or window handle equals `target`.
    ///
    /// Live nodes win over dead ones carrying the same name.
    pub fn find_by_name_or_window(&self, target: &str) -> Option<&SessionNode> {
        let matches = |n: &&SessionNode| n.name == target || n.tmux_window.as_deref() == Some(target);
        self.nodes
            .values()
            .filter(|n| n.status.is_live())
            .find(matches)
            .or_else(|| self.nodes.values().find(matches))
    }

    /// Returns true if a live node uses `window` as its handle.
    pub fn window_in_use(&self, window: &str) -> bool {
        self.nodes
            .values()
            .any(|n| n.status.is_live() && n.window_handle() == window)
    }

    /// Returns `base`, or `base-2`, `base-3`, ... if live nodes already
    /// use it as their window handle.
    #[must_use]
    pub fn unique_window(&self, base: &str) -> String {
        if !self.window_in_use(base) {
            return base.to_string();
        }
        let mut n = 2usize;
        loop {
            let candidate = format!("{base}-{n}");
            if !self.window_in_use(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Nodes without a parent, in table order.
    pub fn roots(&self) -> Vec<&SessionNode> {
        self.nodes.values().filter(|n| n.is_root()).collect()
    }

    /// Returns the parent node of `id`, if both exist.
    pub fn parent_of(&self, id: &SessionId) -> Option<&SessionNode> {
        let parent_id = self.nodes.get(id)?.parent.as_ref()?;
        self.nodes.get(parent_id)
    }

    /// Inserts a new node and links it under its parent.
    ///
    /// # Errors
    ///
    /// * `DomainError::SessionAlreadyExists` - the id is already tracked
    /// * `DomainError::ParentNotFound` - `node.parent` names an unknown node
    pub fn insert(&mut self, node: SessionNode) -> DomainResult<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(DomainError::SessionAlreadyExists {
                session_id: node.id,
            });
        }

        if let Some(parent_id) = &node.parent {
            let parent = self
                .nodes
                .get_mut(parent_id)
                .ok_or_else(|| DomainError::ParentNotFound {
                    session_id: node.id.clone(),
                    parent_id: parent_id.clone(),
                })?;
            parent.children.push(node.id.clone());
        }

        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Sets the status of one node.
    ///
    /// # Errors
    ///
    /// * `DomainError::SessionNotFound` - the id is not tracked
    pub fn set_status(&mut self, id: &SessionId, status: SessionStatus) -> DomainResult<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| DomainError::SessionNotFound {
                session_id: id.clone(),
            })?;
        node.status = status;
        Ok(())
    }

    /// Lists the ids a kill of `id` visits, in visiting order.
    ///
    /// The walk is pre-order: the node itself, then (if `with_children`)
    /// each child subtree in child-list order. It runs over an explicit
    /// stack and never visits an id twice, so a malformed tree with a
    /// cycle still terminates. Ids missing from the table are skipped.
    pub fn kill_order(&self, id: &SessionId, with_children: bool) -> Vec<SessionId> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![id.clone()];

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            order.push(current);

            if with_children {
                stack.extend(node.children.iter().rev().cloned());
            }
        }

        order
    }
}
