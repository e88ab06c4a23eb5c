// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files and environment variables.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	DatabaseConfigLayer, EncryptionConfigLayer, HttpConfigLayer, JobsConfigLayer, LogFormat,
	LoggingConfigLayer, SessionConfigLayer, SettingsConfigLayer, StepUpConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/strongbox/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: STRONGBOX_<SECTION>_<FIELD>. Directory users are file-only.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(HttpConfigLayer {
				host: env_var("STRONGBOX_HOST"),
				port: env_parse("STRONGBOX_PORT")?,
			}),
			database: Some(DatabaseConfigLayer {
				url: env_var("STRONGBOX_DATABASE_URL"),
			}),
			encryption: Some(EncryptionConfigLayer {
				key_env: env_var("STRONGBOX_ENCRYPTION_KEY_ENV"),
				key_file: env_var("STRONGBOX_ENCRYPTION_KEY_FILE").map(PathBuf::from),
				key_id: env_parse("STRONGBOX_ENCRYPTION_KEY_ID")?,
			}),
			settings: Some(SettingsConfigLayer {
				require_password_verification: env_bool("STRONGBOX_REQUIRE_PASSWORD_VERIFICATION"),
				audit_log_retention_days: env_parse("STRONGBOX_AUDIT_LOG_RETENTION_DAYS")?,
			}),
			step_up: Some(StepUpConfigLayer {
				max_lifetime_secs: env_parse("STRONGBOX_STEP_UP_MAX_LIFETIME_SECS")?,
			}),
			session: Some(SessionConfigLayer {
				lifetime_secs: env_parse("STRONGBOX_SESSION_LIFETIME_SECS")?,
			}),
			jobs: Some(JobsConfigLayer {
				audit_cleanup_interval_secs: env_parse("STRONGBOX_AUDIT_CLEANUP_INTERVAL_SECS")?,
				audit_cleanup_batch_size: env_parse("STRONGBOX_AUDIT_CLEANUP_BATCH_SIZE")?,
				session_prune_interval_secs: env_parse("STRONGBOX_SESSION_PRUNE_INTERVAL_SECS")?,
			}),
			logging: Some(LoggingConfigLayer {
				level: env_var("STRONGBOX_LOG_LEVEL"),
				format: env_log_format("STRONGBOX_LOG_FORMAT")?,
			}),
			directory: None,
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {} value '{v}'", std::any::type_name::<T>()),
		}),
		None => Ok(None),
	}
}

fn env_log_format(name: &str) -> Result<Option<LogFormat>, ConfigError> {
	match env_var(name).as_deref().map(str::to_ascii_lowercase).as_deref() {
		None => Ok(None),
		Some("pretty") => Ok(Some(LogFormat::Pretty)),
		Some("json") => Ok(Some(LogFormat::Json)),
		Some(other) => Err(ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("expected 'pretty' or 'json', got '{other}'"),
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.http.is_none());
		assert!(layer.database.is_none());
	}

	#[test]
	fn test_toml_source_missing_file_returns_empty() {
		let layer = TomlSource::new("/nonexistent/strongbox.toml").load().unwrap();
		assert!(layer.http.is_none());
	}

	#[test]
	fn test_toml_source_parse_error_names_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[http\nport = ").unwrap();
		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_env_parse_rejects_garbage() {
		std::env::set_var("STRONGBOX_TEST_ONLY_BAD_NUMBER", "eleven");
		let err = env_parse::<u32>("STRONGBOX_TEST_ONLY_BAD_NUMBER").unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { .. }));
		std::env::remove_var("STRONGBOX_TEST_ONLY_BAD_NUMBER");
	}

	#[test]
	fn test_env_log_format() {
		std::env::set_var("STRONGBOX_TEST_ONLY_LOG_FORMAT", "JSON");
		assert_eq!(
			env_log_format("STRONGBOX_TEST_ONLY_LOG_FORMAT").unwrap(),
			Some(LogFormat::Json)
		);
		std::env::set_var("STRONGBOX_TEST_ONLY_LOG_FORMAT", "xml");
		assert!(env_log_format("STRONGBOX_TEST_ONLY_LOG_FORMAT").is_err());
		std::env::remove_var("STRONGBOX_TEST_ONLY_LOG_FORMAT");
	}
}
