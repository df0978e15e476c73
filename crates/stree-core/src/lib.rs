//! stree Core - Shared types for session tree orchestration
//!
//! This crate provides the domain types shared between the engine
//! (stree-engine) and the CLI (stree): session nodes, the session tree
//! aggregate, the tree renderer and the prompt/naming templates.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod error;
pub mod render;
pub mod session;
pub mod template;
pub mod tree;

// Re-exports for convenience
pub use error::{DomainError, DomainResult};
pub use render::{render_tree, NO_SESSIONS_MESSAGE};
pub use session::{SessionId, SessionNode, SessionStatus, SpawnMode};
pub use template::{numbered_tasks, shell_quote, substitute, task_slug, window_name, PromptVars};
pub use tree::SessionTree;
