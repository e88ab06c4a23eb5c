// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Where the payload encryption key comes from.
//!
//! The key itself never passes through configuration; only the name of the
//! environment variable and the path of the key file do.

use std::path::PathBuf;

use serde::Deserialize;

pub const DEFAULT_KEY_ENV: &str = "STRONGBOX_ENCRYPTION_KEY";
const DEFAULT_KEY_ID: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionConfig {
	/// Environment variable holding the base64 key. Checked first.
	pub key_env: String,
	pub key_file: Option<PathBuf>,
	pub key_id: u32,
}

impl Default for EncryptionConfig {
	fn default() -> Self {
		Self {
			key_env: DEFAULT_KEY_ENV.to_string(),
			key_file: None,
			key_id: DEFAULT_KEY_ID,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncryptionConfigLayer {
	#[serde(default)]
	pub key_env: Option<String>,
	#[serde(default)]
	pub key_file: Option<PathBuf>,
	#[serde(default)]
	pub key_id: Option<u32>,
}

impl EncryptionConfigLayer {
	pub fn merge(&mut self, other: EncryptionConfigLayer) {
		if other.key_env.is_some() {
			self.key_env = other.key_env;
		}
		if other.key_file.is_some() {
			self.key_file = other.key_file;
		}
		if other.key_id.is_some() {
			self.key_id = other.key_id;
		}
	}

	pub fn finalize(self) -> EncryptionConfig {
		EncryptionConfig {
			key_env: self.key_env.unwrap_or_else(|| DEFAULT_KEY_ENV.to_string()),
			key_file: self.key_file,
			key_id: self.key_id.unwrap_or(DEFAULT_KEY_ID),
		}
	}
}
