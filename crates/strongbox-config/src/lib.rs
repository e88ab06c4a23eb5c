// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the Strongbox server.
//!
//! This crate provides:
//! - Layered configuration from defaults, a TOML file and the environment
//!   (`STRONGBOX_*`)
//! - The typed runtime [`Settings`] and the [`SettingsProvider`] seam
//!
//! # Usage
//!
//! ```ignore
//! use strongbox_config::load_config_with_file;
//!
//! let config = load_config_with_file("/etc/strongbox/server.toml")?;
//! println!("listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod settings;
pub mod sources;

pub use error::{ConfigError, SettingsError};
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use settings::{
	Settings, SettingsProvider, StaticSettings, DEFAULT_AUDIT_LOG_RETENTION_DAYS,
	MAX_AUDIT_LOG_RETENTION_DAYS,
};
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::collections::HashSet;

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub encryption: EncryptionConfig,
	/// Seed for the settings store on first start.
	pub settings: Settings,
	pub step_up: StepUpConfig,
	pub session: SessionConfig,
	pub jobs: JobsConfig,
	pub logging: LoggingConfig,
	pub directory: DirectoryConfig,
}

impl ServerConfig {
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`STRONGBOX_*`)
/// 2. Config file (`/etc/strongbox/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Resolve a merged layer and validate it.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		database: layer.database.unwrap_or_default().finalize(),
		encryption: layer.encryption.unwrap_or_default().finalize(),
		settings: layer.settings.unwrap_or_default().finalize(),
		step_up: layer.step_up.unwrap_or_default().finalize(),
		session: layer.session.unwrap_or_default().finalize(),
		jobs: layer.jobs.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
		directory: layer.directory.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		key_env = %config.encryption.key_env,
		key_file_configured = config.encryption.key_file.is_some(),
		directory_users = config.directory.users.len(),
		"server configuration loaded"
	);

	Ok(config)
}

fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	if config.http.port == 0 {
		return Err(ConfigError::Validation("http.port must not be 0".to_string()));
	}

	config
		.settings
		.validate()
		.map_err(|e| ConfigError::Validation(e.to_string()))?;

	if config.session.lifetime_secs == 0 {
		return Err(ConfigError::Validation(
			"session.lifetime_secs must be greater than 0".to_string(),
		));
	}
	if config.step_up.max_lifetime_secs == Some(0) {
		return Err(ConfigError::Validation(
			"step_up.max_lifetime_secs must be greater than 0 when set".to_string(),
		));
	}
	if config.jobs.audit_cleanup_interval_secs == 0 || config.jobs.audit_cleanup_batch_size == 0 {
		return Err(ConfigError::Validation(
			"jobs.audit_cleanup_interval_secs and jobs.audit_cleanup_batch_size must be greater than 0"
				.to_string(),
		));
	}
	if config.jobs.session_prune_interval_secs == 0 {
		return Err(ConfigError::Validation(
			"jobs.session_prune_interval_secs must be greater than 0".to_string(),
		));
	}

	let mut seen = HashSet::new();
	for user in &config.directory.users {
		if user.username.trim().is_empty() {
			return Err(ConfigError::Validation(
				"directory.users entries need a username".to_string(),
			));
		}
		if !seen.insert(user.username.as_str()) {
			return Err(ConfigError::Validation(format!(
				"duplicate directory user '{}'",
				user.username
			)));
		}
	}

	Ok(())
}
