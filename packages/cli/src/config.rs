use screenkit_editor::{EditorConfig, DEFAULT_HISTORY_LIMIT};
use screenkit_stream::ReconnectPolicy;
use screenkit_validator::{ValidatorOptions, DEFAULT_CONTEXT_FIELDS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "screenkit.config.json";

/// Screenkit configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Undo snapshots kept per editing session
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Context fields `{{context.*}}` expressions may read
    #[serde(default = "default_context_fields")]
    pub context_fields: Vec<String>,

    #[serde(default = "default_true")]
    pub naming_conventions: bool,

    /// Reconnect backoff for live data streams
    #[serde(default)]
    pub stream: StreamOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamOptions {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_jitter_ms: u64,
    pub max_attempts: u32,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            max_jitter_ms: 500,
            max_attempts: 10,
        }
    }
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_context_fields() -> Vec<String> {
    DEFAULT_CONTEXT_FIELDS.iter().map(|f| f.to_string()).collect()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load config from an explicit path, or from `cwd` when none is given.
    ///
    /// A missing default file yields the default config; a missing explicit
    /// file is an error.
    pub fn load(cwd: &str, explicit: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                path.to_path_buf()
            }
            None => PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content).map_err(|err| {
                anyhow::anyhow!("Invalid config {}: {}", config_path.display(), err)
            })?;
            tracing::debug!(path = %config_path.display(), "loaded config");
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn validator_options(&self) -> ValidatorOptions {
        ValidatorOptions {
            context_fields: self.context_fields.clone(),
            naming_conventions: self.naming_conventions,
        }
    }

    pub fn editor_config(&self) -> EditorConfig {
        EditorConfig {
            history_limit: self.history_limit,
            validator: self.validator_options(),
        }
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::from_millis(
            self.stream.base_delay_ms,
            self.stream.max_delay_ms,
            self.stream.max_jitter_ms,
            self.stream.max_attempts,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            context_fields: default_context_fields(),
            naming_conventions: true,
            stream: StreamOptions::default(),
        }
    }
}
