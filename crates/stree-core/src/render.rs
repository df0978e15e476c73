//! Text rendering of the session tree.

use std::collections::HashSet;

use crate::{SessionId, SessionTree};

/// Text shown when the tree has no root sessions.
pub const NO_SESSIONS_MESSAGE: &str = "No active sessions";

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Renders the tree as indented text with status glyphs.
///
/// Roots are walked depth-first, pre-order, in table order. Each line is
/// `<prefix><connector><glyph> <name> [<agent>]`.
#[must_use]
pub fn render_tree(tree: &SessionTree) -> String {
    let roots = tree.roots();
    if roots.is_empty() {
        return NO_SESSIONS_MESSAGE.to_string();
    }

    let mut lines = vec![
        format!("🌳 Session Tree ({} sessions)", tree.len()),
        String::new(),
    ];
    let mut visited = HashSet::new();

    let last = roots.len().saturating_sub(1);
    for (index, root) in roots.iter().enumerate() {
        render_node(tree, &root.id, "", index == last, &mut visited, &mut lines);
    }

    lines.join("\n")
}

fn render_node(
    tree: &SessionTree,
    id: &SessionId,
    prefix: &str,
    is_last: bool,
    visited: &mut HashSet<SessionId>,
    lines: &mut Vec<String>,
) {
    if !visited.insert(id.clone()) {
        return;
    }
    let Some(node) = tree.get(id) else {
        return;
    };

    let connector = if is_last { LAST_BRANCH } else { BRANCH };
    let mut line = format!("{prefix}{connector}{} {}", node.status.icon(), node.name);
    if let Some(agent) = &node.agent_type {
        line.push_str(&format!(" [{agent}]"));
    }
    lines.push(line);

    let child_prefix = format!("{prefix}{}", if is_last { SPACE } else { PIPE });
    let last = node.children.len().saturating_sub(1);
    for (index, child) in node.children.iter().enumerate() {
        render_node(tree, child, &child_prefix, index == last, visited, lines);
    }
}
