//! stree Tmux - execution surface plumbing
//!
//! Two ways to host a child session:
//! - `tmux` - a window in the ambient tmux session, driven through the
//!   `Tmux` trait (`TmuxCli` shells out to the tmux binary)
//! - `process` - a detached external process, e.g. a terminal emulator
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod process;
pub mod tmux;

pub use process::{spawn_detached, start_time, terminate, LaunchError, Launched};
pub use tmux::{is_in_tmux, Tmux, TmuxCli, TmuxError};
