// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime settings consulted by the access gate and the audit log.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::SettingsError;

pub const DEFAULT_AUDIT_LOG_RETENTION_DAYS: u32 = 90;
pub const MAX_AUDIT_LOG_RETENTION_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
	/// Reveal requires a fresh step-up verification when set.
	pub require_password_verification: bool,
	/// Zero retains audit entries forever.
	pub audit_log_retention_days: u32,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			require_password_verification: false,
			audit_log_retention_days: DEFAULT_AUDIT_LOG_RETENTION_DAYS,
		}
	}
}

impl Settings {
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.audit_log_retention_days > MAX_AUDIT_LOG_RETENTION_DAYS {
			return Err(SettingsError::Invalid(format!(
				"audit_log_retention_days must be between 0 and {MAX_AUDIT_LOG_RETENTION_DAYS}, got {}",
				self.audit_log_retention_days
			)));
		}
		Ok(())
	}
}

#[async_trait]
pub trait SettingsProvider: Send + Sync {
	async fn get_settings(&self) -> Result<Settings, SettingsError>;

	/// Validate and store. Returns the stored value.
	async fn update_settings(&self, settings: Settings) -> Result<Settings, SettingsError>;
}

/// In-memory settings.
#[derive(Debug, Default)]
pub struct StaticSettings {
	inner: RwLock<Settings>,
}

impl StaticSettings {
	pub fn new(settings: Settings) -> Self {
		Self {
			inner: RwLock::new(settings),
		}
	}
}

#[async_trait]
impl SettingsProvider for StaticSettings {
	async fn get_settings(&self) -> Result<Settings, SettingsError> {
		Ok(*self.inner.read().await)
	}

	async fn update_settings(&self, settings: Settings) -> Result<Settings, SettingsError> {
		settings.validate()?;
		*self.inner.write().await = settings;
		Ok(settings)
	}
}
