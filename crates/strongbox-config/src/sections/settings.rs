// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Initial values for the settings store.
//!
//! Applied only when the store is empty. After that the stored values win and
//! changes go through the settings API.

use serde::Deserialize;

use crate::settings::Settings;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsConfigLayer {
	#[serde(default)]
	pub require_password_verification: Option<bool>,
	#[serde(default)]
	pub audit_log_retention_days: Option<u32>,
}

impl SettingsConfigLayer {
	pub fn merge(&mut self, other: SettingsConfigLayer) {
		if other.require_password_verification.is_some() {
			self.require_password_verification = other.require_password_verification;
		}
		if other.audit_log_retention_days.is_some() {
			self.audit_log_retention_days = other.audit_log_retention_days;
		}
	}

	pub fn finalize(self) -> Settings {
		let defaults = Settings::default();
		Settings {
			require_password_verification: self
				.require_password_verification
				.unwrap_or(defaults.require_password_verification),
			audit_log_retention_days: self
				.audit_log_retention_days
				.unwrap_or(defaults.audit_log_retention_days),
		}
	}
}
