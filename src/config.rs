use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::http::connection::{ConnectionSettings, DEFAULT_READ_BUFFER_SIZE};
use crate::http::parser::{DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_HEAD_SIZE, ScannerLimits};

/// Server configuration.
///
/// Sources are layered: built-in defaults, then an optional YAML file, then
/// the `LISTEN` and `DIRECTORY` environment variables. Command line flags
/// are applied on top by the binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    /// Root directory served by the file routes
    pub directory: PathBuf,
    pub read_buffer_size: usize,
    pub max_head_size: usize,
    pub max_body_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:4221".to_string(),
            directory: PathBuf::from("."),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_head_size: DEFAULT_MAX_HEAD_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl Config {
    /// Loads the file at `path`, if any, and applies the process environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(cfg.with_env(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Overrides fields from environment-style variables.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(listen_addr) = lookup("LISTEN") {
            self.listen_addr = listen_addr;
        }
        if let Some(directory) = lookup("DIRECTORY") {
            self.directory = PathBuf::from(directory);
        }
        self
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            read_buffer_size: self.read_buffer_size,
            limits: ScannerLimits {
                max_head_size: self.max_head_size,
                max_body_size: self.max_body_size,
            },
        }
    }
}
