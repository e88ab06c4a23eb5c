// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Local identity directory.
//!
//! ```toml
//! [[directory.users]]
//! username = "admin"
//! password_hash = "$argon2id$v=19$..."
//! admin = true
//! ```

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryUserConfig {
	pub username: String,
	#[serde(default)]
	pub display_name: Option<String>,
	/// Argon2 PHC string, as printed by `strongbox-server hash-password`.
	pub password_hash: String,
	#[serde(default)]
	pub admin: bool,
	#[serde(default)]
	pub credentials_access: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryConfig {
	pub users: Vec<DirectoryUserConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryConfigLayer {
	#[serde(default)]
	pub users: Option<Vec<DirectoryUserConfig>>,
}

impl DirectoryConfigLayer {
	/// User lists replace rather than append.
	pub fn merge(&mut self, other: DirectoryConfigLayer) {
		if other.users.is_some() {
			self.users = other.users;
		}
	}

	pub fn finalize(self) -> DirectoryConfig {
		DirectoryConfig {
			users: self.users.unwrap_or_default(),
		}
	}
}
