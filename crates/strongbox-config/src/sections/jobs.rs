// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Jobs configuration section.

use serde::{Deserialize, Serialize};

const DEFAULT_AUDIT_CLEANUP_INTERVAL_SECS: u64 = 86400; // 24 hours
const DEFAULT_AUDIT_CLEANUP_BATCH_SIZE: u32 = 500;
const DEFAULT_SESSION_PRUNE_INTERVAL_SECS: u64 = 900; // 15 minutes

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobsConfigLayer {
	pub audit_cleanup_interval_secs: Option<u64>,
	pub audit_cleanup_batch_size: Option<u32>,
	pub session_prune_interval_secs: Option<u64>,
}

impl JobsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.audit_cleanup_interval_secs.is_some() {
			self.audit_cleanup_interval_secs = other.audit_cleanup_interval_secs;
		}
		if other.audit_cleanup_batch_size.is_some() {
			self.audit_cleanup_batch_size = other.audit_cleanup_batch_size;
		}
		if other.session_prune_interval_secs.is_some() {
			self.session_prune_interval_secs = other.session_prune_interval_secs;
		}
	}

	pub fn finalize(self) -> JobsConfig {
		JobsConfig {
			audit_cleanup_interval_secs: self
				.audit_cleanup_interval_secs
				.unwrap_or(DEFAULT_AUDIT_CLEANUP_INTERVAL_SECS),
			audit_cleanup_batch_size: self
				.audit_cleanup_batch_size
				.unwrap_or(DEFAULT_AUDIT_CLEANUP_BATCH_SIZE),
			session_prune_interval_secs: self
				.session_prune_interval_secs
				.unwrap_or(DEFAULT_SESSION_PRUNE_INTERVAL_SECS),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobsConfig {
	pub audit_cleanup_interval_secs: u64,
	pub audit_cleanup_batch_size: u32,
	/// How often expired sessions and step-up entries are dropped.
	pub session_prune_interval_secs: u64,
}

impl Default for JobsConfig {
	fn default() -> Self {
		Self {
			audit_cleanup_interval_secs: DEFAULT_AUDIT_CLEANUP_INTERVAL_SECS,
			audit_cleanup_batch_size: DEFAULT_AUDIT_CLEANUP_BATCH_SIZE,
			session_prune_interval_secs: DEFAULT_SESSION_PRUNE_INTERVAL_SECS,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_layer_finalize_defaults() {
		let config = JobsConfigLayer::default().finalize();
		assert_eq!(config, JobsConfig::default());
		assert_eq!(config.audit_cleanup_interval_secs, 86400);
		assert_eq!(config.session_prune_interval_secs, 900);
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = JobsConfigLayer {
			audit_cleanup_interval_secs: Some(3600),
			audit_cleanup_batch_size: Some(100),
			session_prune_interval_secs: None,
		};
		base.merge(JobsConfigLayer {
			audit_cleanup_interval_secs: None,
			audit_cleanup_batch_size: Some(50),
			session_prune_interval_secs: Some(60),
		});
		assert_eq!(base.audit_cleanup_interval_secs, Some(3600));
		assert_eq!(base.audit_cleanup_batch_size, Some(50));
		assert_eq!(base.session_prune_interval_secs, Some(60));
	}

	#[test]
	fn test_serde_roundtrip() {
		let config = JobsConfig {
			audit_cleanup_interval_secs: 600,
			audit_cleanup_batch_size: 10,
			session_prune_interval_secs: 120,
		};
		let toml_str = toml::to_string(&config).unwrap();
		let parsed: JobsConfig = toml::from_str(&toml_str).unwrap();
		assert_eq!(config, parsed);
	}
}
