//! Configuration schema for Deckflow.

use crate::loader::DEFAULT_CONFIG_DIR;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// File name of the default file substrate.
pub const DEFAULT_STORE_FILE: &str = "sessions.json";

/// Root config for the Deckflow session subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DeckflowConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub waiter: WaiterConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl DeckflowConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> DeckflowConfigBuilder {
        DeckflowConfigBuilder::new()
    }
}

/// Builder for assembling a `DeckflowConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct DeckflowConfigBuilder {
    config: DeckflowConfig,
}

impl DeckflowConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: DeckflowConfig::default(),
        }
    }

    /// Replace the session summary configuration.
    pub fn sessions(mut self, sessions: SessionsConfig) -> Self {
        self.config.sessions = sessions;
        self
    }

    /// Replace the completion waiter configuration.
    pub fn waiter(mut self, waiter: WaiterConfig) -> Self {
        self.config.waiter = waiter;
        self
    }

    /// Replace the storage configuration.
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Finalize and return the built `DeckflowConfig`.
    pub fn build(self) -> DeckflowConfig {
        self.config
    }
}

/// Defaults and limits applied when summarizing sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionsConfig {
    /// Language reported when the outline record has none.
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Model reported when the outline record has none.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Title used when the outline yields no usable first line.
    #[serde(default = "default_untitled_title")]
    pub untitled_title: String,
    /// A first line must be shorter than this many characters to become the title.
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
    /// Age after which `clear_expired` drops records, when set.
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: Option<u64>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            default_model: default_model(),
            untitled_title: default_untitled_title(),
            title_max_chars: default_title_max_chars(),
            max_age_ms: default_max_age_ms(),
        }
    }
}

fn default_language() -> String {
    "中文".to_string()
}

fn default_model() -> String {
    "qwen3-235b".to_string()
}

fn default_untitled_title() -> String {
    "未命名PPT".to_string()
}

fn default_title_max_chars() -> usize {
    50
}

fn default_max_age_ms() -> Option<u64> {
    Some(24 * 60 * 60 * 1000)
}

/// Cadence and budget for waiting on externally created objects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaiterConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl WaiterConfig {
    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Overall wait budget as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_timeout_ms() -> u64 {
    2000
}

/// Where the file-backed substrate lives.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<String>,
}

impl StorageConfig {
    /// Configured substrate path, or `~/.deckflow/sessions.json`.
    pub fn resolve_path(&self) -> Option<PathBuf> {
        match &self.path {
            Some(path) => Some(PathBuf::from(path)),
            None => UserDirs::new().map(|dirs| {
                dirs.home_dir()
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_STORE_FILE)
            }),
        }
    }
}
