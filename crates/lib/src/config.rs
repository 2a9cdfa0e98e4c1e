//! Evaluator configuration.
//!
//! Settings come from `<workspace>/buildmark.toml` when present, then from
//! environment overrides:
//! - `BUILDMARK_PACKAGE_PATH`: package path roots, in platform path-list form
//! - `BUILDMARK_PARALLELISM`: worker thread count
//!
//! ```toml
//! package_path = [".", "../shared"]
//! build_file_name = "BUILD"
//! deleted_packages = ["old/pkg"]
//! keep_going = false
//! parallelism = 8
//! ```

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::consts::{BUILD_FILE_NAME, CONFIG_FILE_NAME, ENV_PACKAGE_PATH, ENV_PARALLELISM};
use crate::label::PackageId;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {}: {message}", path.display())]
  Parse { path: PathBuf, message: String },

  #[error("invalid value '{value}' for {var}")]
  InvalidEnv { var: &'static str, value: String },

  #[error("invalid configuration: {0}")]
  Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluatorConfig {
  /// Roots searched, in order, for package BUILD files.
  pub package_path: Vec<PathBuf>,
  pub build_file_name: String,
  /// Packages treated as if their BUILD file did not exist.
  pub deleted_packages: BTreeSet<PackageId>,
  /// Default mode for commands that do not say otherwise.
  pub keep_going: bool,
  pub parallelism: usize,
}

impl Default for EvaluatorConfig {
  fn default() -> Self {
    Self {
      package_path: Vec::new(),
      build_file_name: BUILD_FILE_NAME.to_string(),
      deleted_packages: BTreeSet::new(),
      keep_going: false,
      parallelism: default_parallelism(),
    }
  }
}

fn default_parallelism() -> usize {
  std::thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}

impl EvaluatorConfig {
  /// Defaults for `workspace`, ignoring any config file and environment.
  pub fn for_workspace(workspace: impl Into<PathBuf>) -> Self {
    Self {
      package_path: vec![workspace.into()],
      ..Self::default()
    }
  }

  /// Load the configuration for `workspace`.
  pub fn load(workspace: &Path) -> Result<Self, ConfigError> {
    let path = workspace.join(CONFIG_FILE_NAME);
    let mut config = match fs::read_to_string(&path) {
      Ok(contents) => toml::from_str::<Self>(&contents).map_err(|e| ConfigError::Parse {
        path: path.clone(),
        message: e.message().to_string(),
      })?,
      Err(e) if e.kind() == io::ErrorKind::NotFound => Self::default(),
      Err(source) => return Err(ConfigError::Read { path, source }),
    };

    if let Some(value) = env::var_os(ENV_PACKAGE_PATH) {
      config.package_path = env::split_paths(&value).filter(|p| !p.as_os_str().is_empty()).collect();
    }
    if let Ok(value) = env::var(ENV_PARALLELISM) {
      config.parallelism = value
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or(ConfigError::InvalidEnv {
          var: ENV_PARALLELISM,
          value,
        })?;
    }

    if config.package_path.is_empty() {
      config.package_path.push(workspace.to_path_buf());
    }
    config.package_path = config
      .package_path
      .into_iter()
      .map(|root| if root.is_relative() { workspace.join(root) } else { root })
      .collect();

    config.validate()?;
    debug!(
      package_path = ?config.package_path,
      parallelism = config.parallelism,
      deleted = config.deleted_packages.len(),
      "loaded configuration"
    );
    Ok(config)
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if self.parallelism == 0 {
      return Err(ConfigError::Invalid("parallelism must be at least 1".to_string()));
    }
    if self.build_file_name.is_empty() || self.build_file_name.contains(['/', '\\']) {
      return Err(ConfigError::Invalid(format!(
        "build_file_name '{}' must be a plain file name",
        self.build_file_name
      )));
    }
    Ok(())
  }
}
