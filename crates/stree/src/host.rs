//! The calling session's environment.
//!
//! Every operation runs on behalf of "the caller": the process issuing the
//! tool call, sitting in some tmux window (or none) and some directory.
//! The caller's tree node is found by matching its window name against the
//! tracked window handles.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use stree_core::{SessionNode, SessionTree};
use stree_tmux::{Tmux, TmuxCli};

/// Parent name used when the caller is not a tracked session.
pub const ROOT_SENTINEL: &str = "root";

/// The caller's tmux handle and working directory.
#[derive(Clone)]
pub struct Host {
    tmux: Arc<dyn Tmux>,
    cwd: PathBuf,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("in_tmux", &self.tmux.in_session())
            .field("cwd", &self.cwd)
            .finish()
    }
}

impl Host {
    pub fn new(tmux: Arc<dyn Tmux>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            tmux,
            cwd: cwd.into(),
        }
    }

    /// Uses the real tmux binary and the process working directory.
    pub fn from_env() -> std::io::Result<Self> {
        Ok(Self::new(Arc::new(TmuxCli::new()), std::env::current_dir()?))
    }

    pub fn tmux(&self) -> &dyn Tmux {
        self.tmux.as_ref()
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Base name of the working directory, used as the project name.
    #[must_use]
    pub fn project_name(&self) -> String {
        self.cwd
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Name of the tmux window the caller runs in, if any.
    pub async fn current_window(&self) -> Option<String> {
        self.tmux.current_window().await
    }
}

/// Finds the caller's node by its window name.
///
/// `None` when the caller has no window or the window is not tracked.
pub fn caller_node<'t>(tree: &'t SessionTree, window: Option<&str>) -> Option<&'t SessionNode> {
    window.and_then(|w| tree.find_by_window(w))
}

/// Joins `relative` onto `base`, treating `relative` as relative even if
/// it is absolute. `.` components are dropped.
///
/// An agent's `default_dir` of `/srv` therefore resolves to `<base>/srv`.
#[must_use]
pub fn join_relative(base: &Path, relative: &Path) -> PathBuf {
    let mut joined = base.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::ParentDir => joined.push(".."),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    joined
}
