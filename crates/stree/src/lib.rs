//! stree Engine - Session tree orchestration
//!
//! Spawns agent sessions as children of the calling session (tmux windows
//! or detached terminals), tracks them in a persisted tree, and carries
//! reports and focus changes back up to parents.
//!
//! `Tools` is the facade the host runtime talks to; the other modules are
//! usable on their own with an explicit `Config` snapshot.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod kill;
pub mod notify;
pub mod spawn;
pub mod store;
pub mod tools;

// Re-exports for convenience
pub use backend::{terminate_surface, Backend, Surface};
pub use config::{Config, ConfigResolver, NotifyMethod, CONFIG_PATH_ENV, DEFAULT_CONFIG};
pub use error::{ConfigError, EngineError, Result, StoreError};
pub use events::mark_idle;
pub use host::{Host, ROOT_SENTINEL};
pub use kill::{kill_session, Killed};
pub use notify::{focus_parent, report_to_parent, Report, NOTIFICATIONS_FILE};
pub use spawn::{spawn, SpawnRequest, Spawned};
pub use store::TreeStore;
pub use tools::{ReportResult, SpawnResult, ToolResult, Tools};
