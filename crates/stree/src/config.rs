//! Configuration resolution.
//!
//! The bundled default (`assets/stree.default.yml`) is always loaded first.
//! A user file, when present, is merged on top key by key at the top level
//! only: a user `agents:` section replaces the whole default agent map.
//! A user file that fails to parse is logged and ignored.
//!
//! Configuration is resolved again for every operation and handed to the
//! operation as a plain `Config` value.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use stree_core::{shell_quote, SpawnMode};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// The default configuration, embedded at compile time.
pub const DEFAULT_CONFIG: &str = include_str!("../assets/stree.default.yml");

/// Environment variable overriding the user configuration path.
pub const CONFIG_PATH_ENV: &str = "STREE_CONFIG";

// ============================================================================
// Typed Configuration
// ============================================================================

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub spawn_mode: SpawnMode,
    pub tmux: TmuxConfig,
    pub terminal: TerminalConfig,
    #[serde(default)]
    pub host: HostConfig,
    pub agents: IndexMap<String, AgentConfig>,
    pub tracking: TrackingConfig,
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub events: IndexMap<String, EventConfig>,
    pub cleanup: CleanupConfig,
    pub templates: TemplatesConfig,
    pub cli: CliConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmuxConfig {
    pub root_session: String,
    pub child_pattern: String,
    pub window_pattern: String,
}

/// External terminal launch template.
///
/// `args` may contain `{name}`, `{dir}` and `{command}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// The agent program started inside each child surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    pub command: String,
    pub prompt_flag: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            command: "opencode".to_string(),
            prompt_flag: "--prompt".to_string(),
        }
    }
}

impl HostConfig {
    /// Shell command line that starts the host program with `prompt`.
    #[must_use]
    pub fn startup_command(&self, prompt: &str) -> String {
        format!("{} {} {}", self.command, self.prompt_flag, shell_quote(prompt))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub description: String,
    #[serde(default)]
    pub color: String,
    /// Directory relative to the spawning session's directory.
    #[serde(default = "default_agent_dir")]
    pub default_dir: String,
}

fn default_agent_dir() -> String {
    ".".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Path of the session tree file; a leading `~` is the home directory.
    pub state_file: String,
    #[serde(default)]
    pub active_sessions_file: String,
    #[serde(default)]
    pub auto_update: bool,
    #[serde(default)]
    pub metadata: Vec<String>,
}

/// How a child's report is announced to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotifyMethod {
    /// Flash a message on the parent's tmux window.
    #[default]
    #[serde(alias = "in-band-message")]
    TmuxMessage,
    /// Append a line to the parent's `.notifications` file.
    File,
    Both,
    None,
}

impl NotifyMethod {
    #[must_use]
    pub fn sends_message(self) -> bool {
        matches!(self, Self::TmuxMessage | Self::Both)
    }

    #[must_use]
    pub fn writes_file(self) -> bool {
        matches!(self, Self::File | Self::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionConfig {
    pub auto_focus_parent: bool,
    pub notify_method: NotifyMethod,
    pub reports_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventConfig {
    #[serde(default)]
    pub log: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Seconds of idleness after which a session counts as stale.
    pub idle_timeout: u64,
    pub confirm_kill: bool,
    pub preserve_tree: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatesConfig {
    pub agent_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    pub show_tree_on_spawn: bool,
    pub confirm_spawn: bool,
    pub editor: String,
}

impl Config {
    /// Parses the bundled default configuration.
    pub fn bundled() -> Result<Self, ConfigError> {
        serde_yaml::from_str(DEFAULT_CONFIG).map_err(ConfigError::InvalidDefault)
    }

    /// Path of the session tree file with `~` expanded.
    #[must_use]
    pub fn state_file_path(&self) -> PathBuf {
        expand_tilde(&self.tracking.state_file)
    }

    /// Configured agent types, comma separated, in configuration order.
    #[must_use]
    pub fn agent_type_list(&self) -> String {
        self.agents
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Returns true if `event` is configured with `log: true`.
    #[must_use]
    pub fn logs_event(&self, event: &str) -> bool {
        self.events.get(event).is_some_and(|e| e.log)
    }
}

/// Expands a leading `~` to the home directory.
///
/// Paths without a leading `~` (or when no home directory is known) are
/// returned unchanged.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest.trim_start_matches('/')),
        None => PathBuf::from(path),
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Loads the default configuration and merges the user override.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    user_path: PathBuf,
}

impl ConfigResolver {
    /// Uses `user_path` as the user override file.
    pub fn new(user_path: impl Into<PathBuf>) -> Self {
        Self {
            user_path: user_path.into(),
        }
    }

    /// Uses `$STREE_CONFIG`, or `stree/stree.yml` in the user config directory.
    pub fn from_env() -> Self {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Self::new(path);
        }
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stree")
            .join("stree.yml");
        Self::new(path)
    }

    /// Path of the user override file.
    pub fn user_path(&self) -> &Path {
        &self.user_path
    }

    /// Resolves the effective configuration.
    ///
    /// A missing user file is created from the default text. Read or parse
    /// failures of the user file fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Only `ConfigError::InvalidDefault`, when the bundled file is broken.
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        let defaults: Value =
            serde_yaml::from_str(DEFAULT_CONFIG).map_err(ConfigError::InvalidDefault)?;
        let default_config = Config::bundled()?;

        if !self.user_path.exists() {
            self.ensure_user_file();
            return Ok(default_config);
        }

        match self.load_merged(defaults) {
            Ok(config) => {
                debug!(path = %self.user_path.display(), "Loaded user configuration");
                Ok(config)
            }
            Err(reason) => {
                warn!(
                    path = %self.user_path.display(),
                    error = %reason,
                    "Failed to load user config, using defaults"
                );
                Ok(default_config)
            }
        }
    }

    /// Writes the default configuration to the user path if it is missing.
    ///
    /// Returns true if the file exists afterwards.
    pub fn ensure_user_file(&self) -> bool {
        if self.user_path.exists() {
            return true;
        }
        if let Some(parent) = self.user_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "Failed to create config directory");
                return false;
            }
        }
        match fs::write(&self.user_path, DEFAULT_CONFIG) {
            Ok(()) => {
                info!(path = %self.user_path.display(), "Created default configuration");
                true
            }
            Err(e) => {
                warn!(path = %self.user_path.display(), error = %e, "Failed to create default configuration");
                false
            }
        }
    }

    fn load_merged(&self, defaults: Value) -> Result<Config, String> {
        let text = fs::read_to_string(&self.user_path).map_err(|e| e.to_string())?;
        let user: Value = serde_yaml::from_str(&text).map_err(|e| e.to_string())?;
        let merged = shallow_merge(defaults, user)?;
        serde_yaml::from_value(merged).map_err(|e| e.to_string())
    }
}

/// Replaces top-level keys of `base` with those of `overlay`.
///
/// An empty (null) overlay leaves `base` untouched; any other non-mapping
/// overlay is an error.
fn shallow_merge(base: Value, overlay: Value) -> Result<Value, String> {
    let mut merged = match base {
        Value::Mapping(map) => map,
        _ => Mapping::new(),
    };
    match overlay {
        Value::Null => {}
        Value::Mapping(user) => {
            for (key, value) in user {
                merged.insert(key, value);
            }
        }
        other => {
            return Err(format!(
                "expected a mapping at the top level, found {}",
                value_kind(&other)
            ))
        }
    }
    Ok(Value::Mapping(merged))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

// ============================================================================
// Tests
// ============================================================================
