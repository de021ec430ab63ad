//! Configuration for dashsync.
//!
//! Settings are read from `.dashsync/dashsync.toml` in the working directory,
//! or `<config_dir>/dashsync/dashsync.toml` when there is no local file.
//! Layering is file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! url = "http://localhost:3000"
//! request_timeout_secs = 30
//!
//! [stream]
//! path = "/api/events"
//! idle_timeout_secs = 90
//! reconnect_delay_ms = 1000
//! max_reconnect_delay_ms = 30000
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! file = ".dashsync/logs/dashsync.log"
//!
//! [session]
//! project = "my-project"
//! ```
//!
//! # Environment Variables
//!
//! | Variable               | Overrides          |
//! |------------------------|--------------------|
//! | `DASHSYNC_SERVER_URL`  | `server.url`       |
//! | `DASHSYNC_PROJECT`     | `session.project`  |
//! | `DASHSYNC_LOG_LEVEL`   | `logging.level`    |
//! | `DASHSYNC_LOG_FORMAT`  | `logging.format`   |

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{SyncError, SyncResult};
use crate::sync::stream::StreamSettings;

pub const CONFIG_DIR: &str = ".dashsync";
pub const CONFIG_FILE: &str = "dashsync.toml";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid log format '{}'. Valid values: pretty, json", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Base URL of the dashboard server
    #[serde(default = "default_server_url")]
    pub url: String,
    /// Timeout for command and fetch requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_server_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSection {
    /// Path of the push channel, relative to the server URL
    #[serde(default = "default_stream_path")]
    pub path: String,
    /// A stream silent for this long is treated as disconnected
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,
}

fn default_stream_path() -> String {
    "/api/events".to_string()
}

fn default_idle_timeout_secs() -> u64 {
    90
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30_000
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            path: default_stream_path(),
            idle_timeout_secs: default_idle_timeout_secs(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Also write logs to this file, rotated daily
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSection {
    /// Project selected when none is given on the command line
    #[serde(default)]
    pub project: Option<String>,
}

/// Parsed `dashsync.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub stream: StreamSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub session: SessionSection,
}

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub server_url: Option<String>,
    pub project: Option<String>,
}

impl DashConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse dashsync.toml")
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize dashsync.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Locate the config file: the project-local one first, then the user
    /// config directory.
    pub fn discover(project_dir: &Path) -> Option<PathBuf> {
        let local = local_config_path(project_dir);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("dashsync").join(CONFIG_FILE))
            .filter(|path| path.exists())
    }

    /// Load the file found by [`DashConfig::discover`], or defaults.
    pub fn load_or_default(project_dir: &Path) -> Result<Self> {
        match Self::discover(project_dir) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Full layering: explicit file (or discovered one) → env → CLI.
    pub fn resolve(project_dir: &Path, explicit: Option<&Path>, cli: &CliOverrides) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::load_or_default(project_dir)?,
        };
        config.apply_env()?;
        config.apply_overrides(cli);
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DASHSYNC_SERVER_URL") {
            self.server.url = url;
        }
        if let Some(project) = lookup("DASHSYNC_PROJECT") {
            self.session.project = Some(project);
        }
        if let Some(level) = lookup("DASHSYNC_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("DASHSYNC_LOG_FORMAT") {
            self.logging.format = format.parse().context("DASHSYNC_LOG_FORMAT")?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, cli: &CliOverrides) {
        if let Some(url) = &cli.server_url {
            self.server.url = url.clone();
        }
        if let Some(project) = &cli.project {
            self.session.project = Some(project.clone());
        }
    }

    /// Validate the configuration and return every problem found.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.server.url.trim().is_empty() {
            problems.push("server.url is empty".to_string());
        } else {
            match Url::parse(&self.server.url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => problems.push(format!(
                    "server.url '{}' has unsupported scheme '{}'",
                    self.server.url,
                    url.scheme()
                )),
                Err(e) => problems.push(format!("server.url '{}' is invalid: {}", self.server.url, e)),
            }
        }

        if self.server.request_timeout_secs == 0 {
            problems.push("server.request_timeout_secs must be greater than 0".to_string());
        }
        if self.stream.idle_timeout_secs == 0 {
            problems.push("stream.idle_timeout_secs must be greater than 0".to_string());
        }
        if !self.stream.path.starts_with('/') {
            problems.push(format!("stream.path '{}' must start with '/'", self.stream.path));
        }
        if self.stream.reconnect_delay_ms > self.stream.max_reconnect_delay_ms {
            problems.push(format!(
                "stream.reconnect_delay_ms ({}) exceeds stream.max_reconnect_delay_ms ({})",
                self.stream.reconnect_delay_ms, self.stream.max_reconnect_delay_ms
            ));
        }

        problems
    }

    pub fn ensure_valid(&self) -> SyncResult<()> {
        let problems = self.validate();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(SyncError::Config(problems.join("; ")))
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn stream_url(&self) -> String {
        format!("{}{}", self.server.url.trim_end_matches('/'), self.stream.path)
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            url: self.stream_url(),
            idle_timeout: Duration::from_secs(self.stream.idle_timeout_secs),
            reconnect_delay: Duration::from_millis(self.stream.reconnect_delay_ms),
            max_reconnect_delay: Duration::from_millis(self.stream.max_reconnect_delay_ms),
        }
    }
}

pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_DIR).join(CONFIG_FILE)
}
