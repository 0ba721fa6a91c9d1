#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for keg
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/keg/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

use keg_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub cleaner: CleanerConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    Auto,
    Never,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
    /// Print every action and do not truncate headings to the terminal width
    #[serde(default)]
    pub verbose: bool,
}

/// Cleaner policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanerConfig {
    /// Keep `<prefix>/share/info` instead of removing it
    #[serde(default)]
    pub keep_info: bool,
    /// File extensions treated as stale build metadata and deleted outright
    #[serde(default = "default_stale_extensions")]
    pub stale_extensions: Vec<String>,
    /// Extra arguments passed to `strip` for executables
    #[serde(default)]
    pub strip_args: Vec<String>,
    /// Skip files whose type probe fails instead of aborting the clean
    #[serde(default)]
    pub skip_unclassifiable: bool,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub cellar: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            color: ColorChoice::Auto,
            verbose: false,
        }
    }
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            keep_info: false,
            stale_extensions: default_stale_extensions(),
            strip_args: Vec::new(),
            skip_unclassifiable: false,
        }
    }
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_stale_extensions() -> Vec<String> {
    // libtool archives
    vec!["la".to_string()]
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("keg").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn from_toml(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            tracing::debug!("no config at {}, using defaults", config_path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Merge overrides from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value that cannot be parsed.
    pub fn merge_env_from<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        // KEG_COLOR
        if let Some(color) = lookup("KEG_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "KEG_COLOR".to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        if let Some(value) = lookup("KEG_VERBOSE") {
            self.general.verbose = parse_flag("KEG_VERBOSE", value)?;
        }

        if let Some(value) = lookup("KEG_KEEP_INFO") {
            self.cleaner.keep_info = parse_flag("KEG_KEEP_INFO", value)?;
        }

        if let Some(value) = lookup("KEG_SKIP_UNCLASSIFIABLE") {
            self.cleaner.skip_unclassifiable = parse_flag("KEG_SKIP_UNCLASSIFIABLE", value)?;
        }

        if let Some(value) = lookup("KEG_CELLAR") {
            self.paths.cellar = Some(PathBuf::from(value));
        }

        Ok(())
    }

    /// Get the cellar path (with default)
    #[must_use]
    pub fn cellar_path(&self) -> PathBuf {
        self.paths
            .cellar
            .clone()
            .unwrap_or_else(|| PathBuf::from("/usr/local/Cellar"))
    }
}

fn parse_flag(field: &str, value: String) -> Result<bool, Error> {
    match value.as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()),
    }
}
