use std::path::{
  Path,
  PathBuf,
};

use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};
use eyre::{
  Result,
  WrapErr,
};
use serde::Deserialize;

/// Settings read from `config.toml`. Command line flags take precedence.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  /// Pretty-print JSON output.
  pub pretty: bool,
  /// Refuse input containing records that match no operation shape instead
  /// of skipping them.
  pub strict: bool,
}

impl Config {
  pub fn from_toml(source: &str) -> Result<Self> {
    toml::from_str(source).wrap_err("failed to parse config")
  }

  /// Load `path`, or the default config file if no path is given. A missing
  /// default file yields the default config; a missing explicit one is an
  /// error.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let (path, explicit) = match path {
      Some(path) => (path.to_path_buf(), true),
      None => {
        match default_config_file() {
          Some(path) => (path, false),
          None => return Ok(Self::default()),
        }
      },
    };

    if !explicit && !path.exists() {
      log::debug!("no config at {}, using defaults", path.display());
      return Ok(Self::default());
    }

    let source = std::fs::read_to_string(&path)
      .wrap_err_with(|| format!("failed to read config file {}", path.display()))?;
    Self::from_toml(&source).wrap_err_with(|| format!("in {}", path.display()))
  }
}

pub fn config_dir() -> Option<PathBuf> {
  if let Ok(dir) = std::env::var("THE_DELTA_CONFIG_DIR") {
    return Some(PathBuf::from(dir));
  }
  let strategy = choose_base_strategy().ok()?;
  let mut path = strategy.config_dir();
  path.push("the-delta");
  Some(path)
}

pub fn default_config_file() -> Option<PathBuf> {
  config_dir().map(|dir| dir.join("config.toml"))
}
