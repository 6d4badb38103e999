//! Runtime configuration.
//!
//! Configuration is a TOML file where every key is optional:
//!
//! ```toml
//! app_name = "formsync"
//!
//! [dialog]
//! display_name = "pdf"
//! pattern = "*.pdf"
//!
//! [log]
//! level = "info"
//! ```

#![warn(missing_docs)]

mod error;

use std::path::Path;

pub use error::{ConfigError, Result};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// Application name; prefixes generated document files.
	pub app_name: String,
	/// File picker filter.
	pub dialog: DialogConfig,
	/// Logging settings.
	pub log: LogConfig,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			app_name: "formsync".to_string(),
			dialog: DialogConfig::default(),
			log: LogConfig::default(),
		}
	}
}

/// File picker filter shown when opening a document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DialogConfig {
	/// Label of the filter.
	pub display_name: String,
	/// Glob pattern, `*.ext` or `*`.
	pub pattern: String,
}

impl Default for DialogConfig {
	fn default() -> Self {
		Self {
			display_name: "pdf".to_string(),
			pattern: "*.pdf".to_string(),
		}
	}
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
	/// Default filter directive, overridden by `RUST_LOG`.
	pub level: String,
}

impl Default for LogConfig {
	fn default() -> Self {
		Self { level: "info".to_string() }
	}
}

impl Config {
	/// Parses configuration from TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self> {
		let config: Self = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and parses a configuration file.
	pub fn load(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}

	/// Like [`Self::load`], but a missing file yields the defaults.
	pub fn load_or_default(path: &Path) -> Result<Self> {
		match Self::load(path) {
			Err(ConfigError::Io { error, .. }) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
			other => other,
		}
	}

	fn validate(&self) -> Result<()> {
		let pattern = &self.dialog.pattern;
		let valid = pattern == "*"
			|| pattern
				.strip_prefix("*.")
				.is_some_and(|ext| !ext.is_empty() && !ext.contains(['*', '/']));
		if !valid {
			return Err(ConfigError::InvalidPattern(pattern.clone()));
		}
		Ok(())
	}
}
