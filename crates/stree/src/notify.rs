//! Notification bridge: child → parent reporting and focus switching.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::host::{caller_node, Host};
use crate::store::TreeStore;

/// File in the parent's directory collecting report notifications.
pub const NOTIFICATIONS_FILE: &str = ".notifications";

/// A written report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub path: PathBuf,
    /// Window (or name) of the parent that was notified.
    pub parent_handle: String,
}

/// Writes a report for the caller's parent and notifies it.
///
/// The report lands in `<caller dir>/<reports_dir>/<report_name>.md`.
/// Notification delivery follows `interaction.notify_method`; delivery
/// failures are logged and do not fail the report.
///
/// # Errors
///
/// * `EngineError::NoParent` - the caller is untracked or a root
/// * `EngineError::ParentNotInTree` - the parent id does not resolve
/// * `EngineError::InvalidReportName` - the name is empty or has path parts
/// * `EngineError::Io` - the report could not be written
pub async fn report_to_parent(
    host: &Host,
    config: &Config,
    store: &TreeStore,
    content: &str,
    report_name: &str,
) -> Result<Report> {
    let tree = store.load();
    let window = host.current_window().await;
    let caller = caller_node(&tree, window.as_deref()).ok_or(EngineError::NoParent)?;
    if caller.parent.is_none() {
        return Err(EngineError::NoParent);
    }
    let parent = tree.parent_of(&caller.id).ok_or(EngineError::ParentNotInTree)?;

    validate_report_name(report_name)?;

    let working_dir = if caller.working_dir.as_os_str().is_empty() {
        host.cwd()
    } else {
        caller.working_dir.as_path()
    };
    let reports_dir = working_dir.join(&config.interaction.reports_dir);
    fs::create_dir_all(&reports_dir)
        .await
        .map_err(|source| EngineError::Io {
            path: reports_dir.clone(),
            source,
        })?;

    let path = reports_dir.join(format!("{report_name}.md"));
    fs::write(&path, content)
        .await
        .map_err(|source| EngineError::Io {
            path: path.clone(),
            source,
        })?;
    info!(path = %path.display(), parent = %parent.id, "Report written");

    let message = format!("Report ready: {report_name} (from {})", caller.name);
    let method = config.interaction.notify_method;

    if method.sends_message() {
        if let Some(parent_window) = parent.tmux_window.as_deref() {
            if let Err(e) = host.tmux().display_message(parent_window, &message).await {
                warn!(window = parent_window, error = %e, "Failed to send tmux message");
            }
        }
    }

    if method.writes_file() {
        let line = format!("[{}] {message}\n", Utc::now().to_rfc3339());
        if let Err(e) = append_line(&parent.working_dir.join(NOTIFICATIONS_FILE), &line).await {
            warn!(dir = %parent.working_dir.display(), error = %e, "Failed to write notification file");
        }
    }

    Ok(Report {
        path,
        parent_handle: parent.window_handle().to_string(),
    })
}

/// Switches tmux focus to the caller's parent window.
///
/// Returns the parent window name.
///
/// # Errors
///
/// * `EngineError::NotInTmux` / `EngineError::FocusDisabled`
/// * `EngineError::NoParent` / `EngineError::ParentNotInTree`
/// * `EngineError::Focus` - tmux refused to switch
pub async fn focus_parent(host: &Host, config: &Config, store: &TreeStore) -> Result<String> {
    if !host.tmux().in_session() {
        return Err(EngineError::NotInTmux);
    }
    if !config.interaction.auto_focus_parent {
        return Err(EngineError::FocusDisabled);
    }

    let tree = store.load();
    let window = host.current_window().await;
    let caller = caller_node(&tree, window.as_deref()).ok_or(EngineError::NoParent)?;
    if caller.parent.is_none() {
        return Err(EngineError::NoParent);
    }
    let parent_window = tree
        .parent_of(&caller.id)
        .and_then(|p| p.tmux_window.clone())
        .ok_or(EngineError::ParentNotInTree)?;

    host.tmux()
        .select_window(&parent_window)
        .await
        .map_err(EngineError::Focus)?;
    debug!(window = %parent_window, "Focused parent window");
    Ok(parent_window)
}

fn validate_report_name(name: &str) -> Result<()> {
    let plain = Path::new(name)
        .file_name()
        .is_some_and(|f| f == name);
    if name.trim().is_empty() || !plain {
        return Err(EngineError::InvalidReportName(name.to_string()));
    }
    Ok(())
}

/// Appends `line` to `path`, creating the file if needed.
async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}
