// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Interactive session and step-up lifetimes.

use serde::Deserialize;

const DEFAULT_SESSION_LIFETIME_SECS: u64 = 8 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
	pub lifetime_secs: u64,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			lifetime_secs: DEFAULT_SESSION_LIFETIME_SECS,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfigLayer {
	#[serde(default)]
	pub lifetime_secs: Option<u64>,
}

impl SessionConfigLayer {
	pub fn merge(&mut self, other: SessionConfigLayer) {
		if other.lifetime_secs.is_some() {
			self.lifetime_secs = other.lifetime_secs;
		}
	}

	pub fn finalize(self) -> SessionConfig {
		SessionConfig {
			lifetime_secs: self.lifetime_secs.unwrap_or(DEFAULT_SESSION_LIFETIME_SECS),
		}
	}
}

/// Step-up verification lasts for the rest of the session unless capped here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepUpConfig {
	pub max_lifetime_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepUpConfigLayer {
	#[serde(default)]
	pub max_lifetime_secs: Option<u64>,
}

impl StepUpConfigLayer {
	pub fn merge(&mut self, other: StepUpConfigLayer) {
		if other.max_lifetime_secs.is_some() {
			self.max_lifetime_secs = other.max_lifetime_secs;
		}
	}

	pub fn finalize(self) -> StepUpConfig {
		StepUpConfig {
			max_lifetime_secs: self.max_lifetime_secs,
		}
	}
}
