// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential data model.
//!
//! - [`CredentialKind`]: closed set of credential types
//! - [`CredentialPayload`]: secret fields, one variant per kind
//! - [`PayloadFields`]: flat form input, turned into a payload by kind
//! - [`CredentialSummary`]: everything except the secret payload

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strongbox_common_secret::SecretString;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::{CredentialError, CredentialResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
	UsernamePassword,
	ApiKey,
	SshKey,
	SecureNote,
}

impl CredentialKind {
	pub const ALL: [CredentialKind; 4] = [
		CredentialKind::UsernamePassword,
		CredentialKind::ApiKey,
		CredentialKind::SshKey,
		CredentialKind::SecureNote,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			CredentialKind::UsernamePassword => "username_password",
			CredentialKind::ApiKey => "api_key",
			CredentialKind::SshKey => "ssh_key",
			CredentialKind::SecureNote => "secure_note",
		}
	}

	/// Human-readable label.
	pub fn label(&self) -> &'static str {
		match self {
			CredentialKind::UsernamePassword => "Username & Password",
			CredentialKind::ApiKey => "API Key",
			CredentialKind::SshKey => "SSH Key / Certificate",
			CredentialKind::SecureNote => "Secure Note",
		}
	}

	/// Payload fields meaningful for this kind.
	pub fn fields(&self) -> &'static [&'static str] {
		match self {
			CredentialKind::UsernamePassword => &["username", "password"],
			CredentialKind::ApiKey => &["api_key"],
			CredentialKind::SshKey => &["ssh_key"],
			CredentialKind::SecureNote => &["secure_note"],
		}
	}
}

impl fmt::Display for CredentialKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for CredentialKind {
	type Err = CredentialError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		CredentialKind::ALL
			.into_iter()
			.find(|k| k.as_str() == s)
			.ok_or_else(|| CredentialError::Validation(format!("unknown credential type '{s}'")))
	}
}

/// Entry of `list_credential_types`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialTypeInfo {
	#[serde(rename = "type")]
	pub kind: CredentialKind,
	pub label: &'static str,
	pub fields: &'static [&'static str],
}

/// Decrypted secret fields. Only ever built transiently while encrypting or
/// revealing; every field is zeroized on drop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialPayload {
	UsernamePassword {
		#[serde(default)]
		username: SecretString,
		#[serde(default)]
		password: SecretString,
	},
	ApiKey {
		api_key: SecretString,
	},
	SshKey {
		ssh_key: SecretString,
	},
	SecureNote {
		secure_note: SecretString,
	},
}

/// Borrowed view of a payload with the secret values exposed. Serializes
/// with the same tagged layout that [`CredentialPayload`] deserializes from.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExposedPayload<'a> {
	UsernamePassword { username: &'a str, password: &'a str },
	ApiKey { api_key: &'a str },
	SshKey { ssh_key: &'a str },
	SecureNote { secure_note: &'a str },
}

impl CredentialPayload {
	pub fn kind(&self) -> CredentialKind {
		match self {
			CredentialPayload::UsernamePassword { .. } => CredentialKind::UsernamePassword,
			CredentialPayload::ApiKey { .. } => CredentialKind::ApiKey,
			CredentialPayload::SshKey { .. } => CredentialKind::SshKey,
			CredentialPayload::SecureNote { .. } => CredentialKind::SecureNote,
		}
	}

	/// Build the variant for `kind` from flat form fields. Fields that do not
	/// belong to `kind` are rejected.
	pub fn from_fields(kind: CredentialKind, fields: PayloadFields) -> CredentialResult<Self> {
		fields.reject_stray(kind)?;

		let PayloadFields {
			username,
			password,
			api_key,
			ssh_key,
			secure_note,
		} = fields;
		let empty = || SecretString::new(String::new());

		Ok(match kind {
			CredentialKind::UsernamePassword => CredentialPayload::UsernamePassword {
				username: username.unwrap_or_else(empty),
				password: password.unwrap_or_else(empty),
			},
			CredentialKind::ApiKey => CredentialPayload::ApiKey {
				api_key: api_key.unwrap_or_else(empty),
			},
			CredentialKind::SshKey => CredentialPayload::SshKey {
				ssh_key: ssh_key.unwrap_or_else(empty),
			},
			CredentialKind::SecureNote => CredentialPayload::SecureNote {
				secure_note: secure_note.unwrap_or_else(empty),
			},
		})
	}

	/// Overlay submitted fields on a stored payload of the same kind. Fields
	/// that were not submitted keep their stored value.
	pub fn merge_fields(self, fields: PayloadFields) -> CredentialResult<Self> {
		fields.reject_stray(self.kind())?;

		let PayloadFields {
			username: new_username,
			password: new_password,
			api_key: new_api_key,
			ssh_key: new_ssh_key,
			secure_note: new_secure_note,
		} = fields;

		Ok(match self {
			CredentialPayload::UsernamePassword { username, password } => {
				CredentialPayload::UsernamePassword {
					username: new_username.unwrap_or(username),
					password: new_password.unwrap_or(password),
				}
			}
			CredentialPayload::ApiKey { api_key } => CredentialPayload::ApiKey {
				api_key: new_api_key.unwrap_or(api_key),
			},
			CredentialPayload::SshKey { ssh_key } => CredentialPayload::SshKey {
				ssh_key: new_ssh_key.unwrap_or(ssh_key),
			},
			CredentialPayload::SecureNote { secure_note } => CredentialPayload::SecureNote {
				secure_note: new_secure_note.unwrap_or(secure_note),
			},
		})
	}

	pub fn exposed(&self) -> ExposedPayload<'_> {
		match self {
			CredentialPayload::UsernamePassword { username, password } => {
				ExposedPayload::UsernamePassword {
					username: username.expose(),
					password: password.expose(),
				}
			}
			CredentialPayload::ApiKey { api_key } => ExposedPayload::ApiKey {
				api_key: api_key.expose(),
			},
			CredentialPayload::SshKey { ssh_key } => ExposedPayload::SshKey {
				ssh_key: ssh_key.expose(),
			},
			CredentialPayload::SecureNote { secure_note } => ExposedPayload::SecureNote {
				secure_note: secure_note.expose(),
			},
		}
	}

	/// Plaintext handed to the cipher.
	pub(crate) fn to_plaintext(&self) -> CredentialResult<Zeroizing<Vec<u8>>> {
		serde_json::to_vec(&self.exposed())
			.map(Zeroizing::new)
			.map_err(|e| CredentialError::Internal(format!("payload encoding failed: {e}")))
	}

	/// Parse decrypted plaintext. Only reached after the AEAD tag verified,
	/// so a parse failure means the record was written wrongly.
	pub(crate) fn from_plaintext(plaintext: &[u8]) -> CredentialResult<Self> {
		serde_json::from_slice(plaintext)
			.map_err(|e| CredentialError::Corrupt(format!("payload does not decode: {e}")))
	}
}

/// Flat payload input as submitted by a form or API client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadFields {
	#[serde(default)]
	pub username: Option<SecretString>,
	#[serde(default)]
	pub password: Option<SecretString>,
	#[serde(default)]
	pub api_key: Option<SecretString>,
	#[serde(default)]
	pub ssh_key: Option<SecretString>,
	#[serde(default)]
	pub secure_note: Option<SecretString>,
}

impl PayloadFields {
	fn reject_stray(&self, kind: CredentialKind) -> CredentialResult<()> {
		match self
			.present_names()
			.into_iter()
			.find(|name| !kind.fields().contains(name))
		{
			Some(stray) => Err(CredentialError::Validation(format!(
				"field '{stray}' does not apply to type '{kind}'"
			))),
			None => Ok(()),
		}
	}

	fn present_names(&self) -> Vec<&'static str> {
		[
			("username", self.username.is_some()),
			("password", self.password.is_some()),
			("api_key", self.api_key.is_some()),
			("ssh_key", self.ssh_key.is_some()),
			("secure_note", self.secure_note.is_some()),
		]
		.into_iter()
		.filter_map(|(name, present)| present.then_some(name))
		.collect()
	}
}

/// A credential without its secret payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSummary {
	pub id: Uuid,
	pub label: String,
	#[serde(rename = "type")]
	pub kind: CredentialKind,
	pub type_label: &'static str,
	pub url: Option<String>,
	/// Stored unencrypted.
	pub notes: Option<String>,
	pub created_by: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub version: i64,
}

/// Result of a successful reveal.
#[derive(Debug)]
pub struct RevealedCredential {
	pub summary: CredentialSummary,
	pub payload: CredentialPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCredentialInput {
	pub label: String,
	#[serde(rename = "type")]
	pub kind: CredentialKind,
	#[serde(default)]
	pub payload: PayloadFields,
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub notes: Option<String>,
}

/// Partial update. For `url` and `notes` an empty string clears the field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCredentialInput {
	#[serde(default)]
	pub label: Option<String>,
	/// Changing type requires a new payload.
	#[serde(default, rename = "type")]
	pub kind: Option<CredentialKind>,
	#[serde(default)]
	pub payload: Option<PayloadFields>,
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub notes: Option<String>,
	/// When set, the update fails with a conflict unless the stored record
	/// is still at this version.
	#[serde(default)]
	pub expected_version: Option<i64>,
}

impl UpdateCredentialInput {
	pub fn is_empty(&self) -> bool {
		self.label.is_none()
			&& self.kind.is_none()
			&& self.payload.is_none()
			&& self.url.is_none()
			&& self.notes.is_none()
	}
}
