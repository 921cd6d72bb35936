//! Interpreter settings.
//!
//! Defaults reproduce the stock preview behavior; a TOML file can tighten or
//! relax the step budget:
//!
//! ```toml
//! max_steps = 100000
//! builtin_constants = true
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MAX_STEPS: u64 = 500_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML syntax: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct InterpreterConfig {
    /// Evaluation steps allowed per run before it fails as a runaway loop.
    pub max_steps: u64,

    /// Seed OLED_WHITE, OLED_FONT_SMALL, TRUE and friends as constants.
    pub builtin_constants: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            builtin_constants: true,
        }
    }
}

impl InterpreterConfig {
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: InterpreterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            file: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_steps == 0 {
            return Err(ConfigError::Validation(
                "max_steps must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
