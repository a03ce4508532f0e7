//! Application configuration.
//!
//! The configuration is a JSON file, by default
//! `$XDG_CONFIG_HOME/herbie/config.json`.  Every section is optional and
//! falls back to its compiled-in defaults.
//!
//! # Example
//!
//! ```json
//! {
//!   "windows": {
//!     "AAA": { "command": "program -opt AAA", "match": { "class": "TheAppClass" } },
//!     "BBB": { "command": "program -opt BBB", "match": { "title": "The X11 Window Title" } }
//!   },
//!   "tasks": {
//!     "aaabbb": "(split horizontal:0.50:1 (clients window:AAA) (clients window:BBB))"
//!   },
//!   "client": { "program": "herbstclient", "timeout_ms": 2000 },
//!   "rules": { "maxage_secs": 10 }
//! }
//! ```

use crate::command::split_command_line;
use crate::tree::Tree;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How to launch and recognize one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Command line spawned to create the window.
    pub command: String,
    /// Client attributes (`class`, `instance`, `title`, ...) the new window
    /// must carry.  All of them must match.
    #[serde(rename = "match", default)]
    pub matches: BTreeMap<String, String>,
}

/// Window name → how to create and match it.
pub type WindowTable = BTreeMap<String, WindowConfig>;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Named windows referenced as `window:<name>` in task layouts.
    #[serde(default)]
    pub windows: WindowTable,

    /// Task name → layout text.
    #[serde(default)]
    pub tasks: BTreeMap<String, String>,

    /// How to reach the window manager.
    #[serde(default)]
    pub client: ClientConfig,

    /// Placement rule settings.
    #[serde(default)]
    pub rules: RuleConfig,

    /// Layout store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

/// Settings for the `herbstclient` control CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Program name or path.
    pub program: String,
    /// A call that takes longer than this is killed (ms).  Protects against
    /// a hung window manager.
    pub timeout_ms: u64,
    /// Separator token used when chaining commands.
    pub delimiter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            program: "herbstclient".into(),
            timeout_ms: 2000,
            delimiter: ".".into(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Placement rule settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Seconds a one-shot placement rule stays valid.
    pub maxage_secs: u64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self { maxage_secs: 10 }
    }
}

impl RuleConfig {
    pub fn maxage(&self) -> Duration {
        Duration::from_secs(self.maxage_secs)
    }
}

/// Layout store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base directory; `$XDG_CONFIG_HOME/herbie/layouts` when unset.
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject windows that would match every client, command lines that
    /// cannot be split into arguments and tasks whose layout does not parse.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, window) in &self.windows {
            if window.matches.is_empty() {
                return Err(ConfigError(format!("window {:?} has no match attributes", name)));
            }
            split_command_line(&window.command)
                .map_err(|e| ConfigError(format!("window {:?}: {}", name, e)))?;
        }
        for (name, layout) in &self.tasks {
            Tree::parse(layout).map_err(|e| ConfigError(format!("task {:?}: {}", name, e)))?;
        }
        Ok(())
    }

    /// Layout text of `task`, if configured.
    pub fn task(&self, task: &str) -> Option<&str> {
        self.tasks.get(task).map(String::as_str)
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
