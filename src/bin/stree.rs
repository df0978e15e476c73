//! stree - spawn and track trees of agent sessions
//!
//! Thin command-line wrapper over the `Tools` facade. Every subcommand
//! prints the operation's message and exits non-zero when it failed.
//!
//! # Usage
//!
//! ```text
//! stree spawn web "build the landing page"   # child of the current window
//! stree tree                                  # show the session tree
//! stree kill web-lead --children              # cascading kill
//! stree report summary < findings.md          # report to the parent
//! stree focus-parent                          # jump to the parent window
//! stree config                                # edit the user configuration
//! ```

use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use stree_engine::{ConfigResolver, Host, ToolResult, Tools};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI Arguments
// ============================================================================

/// stree - spawn and track trees of agent sessions
#[derive(Parser, Debug)]
#[command(name = "stree")]
#[command(about = "Spawn agent sessions as children of the current one and track them as a tree")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Spawn a child agent session of the current window
    Spawn {
        /// Agent type (see `stree list-agents`)
        agent_type: String,
        /// Task description; one task per line
        task: String,
        /// Working directory (defaults to the agent's default_dir)
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,
    },
    /// Show the session tree
    Tree,
    /// Kill a session by name or window
    Kill {
        name: String,
        /// Also kill every descendant
        #[arg(long, short = 'c')]
        children: bool,
    },
    /// List configured agent types
    ListAgents,
    /// Switch tmux focus to the parent window
    FocusParent,
    /// Write a report for the parent session and notify it
    Report {
        /// Report name, without extension
        name: String,
        /// Report content (read from stdin when omitted)
        #[arg(long)]
        content: Option<String>,
    },
    /// Mark the current session idle (host idle-event hook)
    Idle,
    /// Open the user configuration in an editor
    Config {
        /// Only print the configuration path
        #[arg(long)]
        path: bool,
    },
}

// ============================================================================
// Logging
// ============================================================================

/// Returns the log directory.
///
/// Respects XDG Base Directory specification:
/// - Uses `$XDG_STATE_HOME/stree` if set
/// - Falls back to `$HOME/.local/state/stree`
fn get_log_dir() -> Option<PathBuf> {
    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg_state).join("stree"));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local/state/stree"))
}

/// Opens the log file in append mode, creating its directory.
///
/// Returns `None` if any step fails (logging will be disabled).
fn create_log_file() -> Option<fs::File> {
    let log_dir = get_log_dir()?;

    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory {log_dir:?}: {e}");
        return None;
    }

    let log_path = log_dir.join("stree.log");
    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Warning: Failed to open log file {log_path:?}: {e}");
            None
        }
    }
}

/// Logs go to a file so they never mix with the command output.
fn init_logging() {
    if let Some(file) = create_log_file() {
        // Note: "stree=info" is a compile-time constant guaranteed to parse successfully.
        let filter = EnvFilter::from_default_env().add_directive(
            "stree=info"
                .parse()
                .unwrap_or_else(|_| tracing_subscriber::filter::Directive::from(tracing::Level::INFO)),
        );

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("off"))
            .init();
    }
}

// ============================================================================
// Subcommands
// ============================================================================

fn read_stdin() -> Result<String> {
    let mut content = String::new();
    io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read report from stdin")?;
    Ok(content)
}

/// Opens the user configuration in `$EDITOR`, `$VISUAL` or `cli.editor`.
fn edit_config(resolver: &ConfigResolver) -> Result<ToolResult> {
    if !resolver.ensure_user_file() {
        bail!(
            "Failed to create configuration at {}",
            resolver.user_path().display()
        );
    }
    let config = resolver.resolve()?;

    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or(config.cli.editor);
    debug!(editor = %editor, path = %resolver.user_path().display(), "Opening configuration");

    let status = std::process::Command::new(&editor)
        .arg(resolver.user_path())
        .status()
        .with_context(|| format!("Failed to start editor {editor}"))?;

    Ok(ToolResult {
        success: status.success(),
        message: format!("Configuration: {}", resolver.user_path().display()),
    })
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging();

    let resolver = ConfigResolver::from_env();
    let host = Host::from_env().context("Failed to read the current directory")?;
    let tools = Tools::new(resolver, host);
    info!(command = ?args.command, "stree invoked");

    let result = match args.command {
        Command::Spawn {
            agent_type,
            task,
            dir,
        } => {
            let spawned = tools.spawn_child(&agent_type, &task, dir).await;
            let mut message = spawned.message;
            if spawned.success && show_tree_on_spawn(&tools) {
                message = format!("{message}\n\n{}", tools.show_tree().message);
            }
            ToolResult {
                success: spawned.success,
                message,
            }
        }
        Command::Tree => tools.show_tree(),
        Command::Kill { name, children } => tools.kill_session(&name, children).await,
        Command::ListAgents => tools.list_agent_types(),
        Command::FocusParent => tools.focus_parent().await,
        Command::Report { name, content } => {
            let content = match content {
                Some(content) => content,
                None => read_stdin()?,
            };
            let report = tools.report_to_parent(&content, &name).await;
            ToolResult {
                success: report.success,
                message: report.message,
            }
        }
        Command::Idle => tools.session_idle().await,
        Command::Config { path } => {
            if path {
                ToolResult {
                    success: true,
                    message: tools.resolver().user_path().display().to_string(),
                }
            } else {
                edit_config(tools.resolver())?
            }
        }
    };

    if result.success {
        println!("{}", result.message);
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{}", result.message);
        Ok(ExitCode::FAILURE)
    }
}

fn show_tree_on_spawn(tools: &Tools) -> bool {
    tools
        .resolver()
        .resolve()
        .map(|config| config.cli.show_tree_on_spawn)
        .unwrap_or(false)
}
