//! Runtime configuration, read from an optional TOML file layered under
//! `SAFETRACE_*` environment variables.
//!
//! Nested keys use `__` in the environment, e.g.
//! `SAFETRACE_STORAGE__BACKEND=memory` or `SAFETRACE_NOTIFY__ON_CREATE=false`.

use std::path::{Path, PathBuf};

use config::{
  Config, ConfigError, Environment, File,
  builder::{ConfigBuilder, DefaultState},
};
use safetrace_api::{ApiSettings, auth::AccountConfig};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "SAFETRACE";

// ─── Server ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:     String,
  pub port:     u16,
  pub storage:  StorageConfig,
  pub api:      ApiSettings,
  pub notify:   NotifyConfig,
  /// Logins accepted by the API. Without any, only `/sos` and `/track`
  /// are usable.
  pub accounts: Vec<AccountConfig>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:     "127.0.0.1".to_string(),
      port:     8080,
      storage:  StorageConfig::default(),
      api:      ApiSettings::default(),
      notify:   NotifyConfig::default(),
      accounts: Vec::new(),
    }
  }
}

impl ServerConfig {
  /// Read `path` (if it exists) and then the environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_builder(Config::builder().add_source(File::from(path).required(false)))
  }

  fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
    builder
      .add_source(
        Environment::with_prefix(ENV_PREFIX)
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Storage ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
  #[default]
  Sqlite,
  /// Nothing survives a restart.
  Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
  pub backend: Backend,
  /// SQLite database file; a leading `~/` is expanded.
  pub path:    PathBuf,
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self { backend: Backend::default(), path: PathBuf::from("safetrace.db") }
  }
}

impl StorageConfig {
  /// [`Self::path`] with a leading `~` expanded to the user's home directory.
  pub fn resolved_path(&self) -> PathBuf {
    let s = self.path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/")
      && let Ok(home) = std::env::var("HOME")
    {
      return PathBuf::from(home).join(rest);
    }
    self.path.clone()
  }
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
  /// Write messages to the log.
  #[default]
  Log,
  /// POST messages to `webhook_url`.
  Webhook,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
  /// Notify contacts as soon as an alert is created.
  pub on_create:    bool,
  pub transport:    TransportKind,
  pub webhook_url:  Option<String>,
  pub timeout_secs: u64,
}

impl Default for NotifyConfig {
  fn default() -> Self {
    Self {
      on_create:    true,
      transport:    TransportKind::default(),
      webhook_url:  None,
      timeout_secs: 10,
    }
  }
}
