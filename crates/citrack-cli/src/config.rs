//! Layered settings: defaults, then an optional TOML file, then `CITRACK_*`
//! environment variables, then command-line flags.
//!
//! The authorization token is deliberately not a setting; it only comes from
//! `--token` / `CITRACK_TOKEN` or the in-app prompt.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use citrack_client::{ApiConfig, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, tracker::TrackerOptions};
use citrack_core::links::{DEFAULT_FLAG_BASE_URL, DEFAULT_PROFILE_BASE_URL, Links};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub base_url:         String,
  pub timeout_secs:     u64,
  pub flag_base_url:    String,
  pub profile_base_url: String,
  pub page_size:        u32,
  pub follow_cursors:   bool,
  pub log_file:         PathBuf,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      base_url:         DEFAULT_BASE_URL.to_string(),
      timeout_secs:     30,
      flag_base_url:    DEFAULT_FLAG_BASE_URL.to_string(),
      profile_base_url: DEFAULT_PROFILE_BASE_URL.to_string(),
      page_size:        DEFAULT_PAGE_SIZE,
      follow_cursors:   false,
      log_file:         PathBuf::from("citrack.log"),
    }
  }
}

/// Flag values that take precedence over every other layer.
#[derive(Debug, Default)]
pub struct Overrides {
  pub base_url:       Option<String>,
  pub follow_cursors: bool,
  pub log_file:       Option<PathBuf>,
}

impl Settings {
  /// Read the file at `path` (missing is fine) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> { Self::load_with_env(path, None) }

  /// As [`Settings::load`], reading `CITRACK_*` variables from `env` instead
  /// of the process environment when given.
  pub fn load_with_env(
    path: &Path,
    env: Option<config::Map<String, String>>,
  ) -> anyhow::Result<Self> {
    let layered = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("CITRACK")
          .try_parsing(true)
          .source(env),
      )
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    layered
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  pub fn apply(mut self, overrides: Overrides) -> Self {
    if let Some(url) = overrides.base_url {
      self.base_url = url;
    }
    if overrides.follow_cursors {
      self.follow_cursors = true;
    }
    if let Some(path) = overrides.log_file {
      self.log_file = path;
    }
    self
  }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      base_url: self.base_url.clone(),
      timeout:  Duration::from_secs(self.timeout_secs),
      links:    Links {
        flag_base_url:    self.flag_base_url.clone(),
        profile_base_url: self.profile_base_url.clone(),
      },
    }
  }

  pub fn tracker_options(&self) -> TrackerOptions {
    TrackerOptions {
      page_size:      self.page_size.max(1),
      follow_cursors: self.follow_cursors,
    }
  }
}
