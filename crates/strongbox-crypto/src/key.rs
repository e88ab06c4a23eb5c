// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key material loading.
//!
//! Keys are 32 raw bytes, base64 encoded (padded or unpadded) in an
//! environment variable or a file. Key bytes are zeroized on drop and never
//! appear in `Debug` output.

use std::fmt;
use std::path::Path;

use aes_gcm::aead::OsRng;
use base64::{
	engine::general_purpose::{STANDARD, STANDARD_NO_PAD},
	Engine,
};
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroizing;

use crate::cipher::KEY_SIZE;
use crate::error::{CryptoError, CryptoResult};

/// Identifier stored next to every ciphertext so a future rotation can tell
/// which key sealed it.
pub type KeyId = u32;

pub const DEFAULT_KEY_ID: KeyId = 1;

pub struct EncryptionKey {
	id: KeyId,
	material: Zeroizing<[u8; KEY_SIZE]>,
}

impl EncryptionKey {
	pub fn from_bytes(id: KeyId, bytes: &[u8]) -> CryptoResult<Self> {
		if bytes.len() != KEY_SIZE {
			return Err(CryptoError::InvalidKey(format!(
				"expected {KEY_SIZE} bytes, got {}",
				bytes.len()
			)));
		}
		let mut material = Zeroizing::new([0u8; KEY_SIZE]);
		material.copy_from_slice(bytes);
		Ok(Self { id, material })
	}

	pub fn from_base64(id: KeyId, encoded: &str) -> CryptoResult<Self> {
		let trimmed = encoded.trim();
		let decoded = Zeroizing::new(
			STANDARD
				.decode(trimmed.as_bytes())
				.or_else(|_| STANDARD_NO_PAD.decode(trimmed.as_bytes()))
				.map_err(|e| CryptoError::InvalidKey(format!("base64 decoding failed: {e}")))?,
		);
		Self::from_bytes(id, &decoded)
	}

	/// Generate a fresh random key.
	pub fn generate(id: KeyId) -> Self {
		let mut material = Zeroizing::new([0u8; KEY_SIZE]);
		OsRng.fill_bytes(material.as_mut());
		Self { id, material }
	}

	pub fn id(&self) -> KeyId {
		self.id
	}

	/// Base64 encoding of the key, for `generate-key` output only.
	pub fn to_base64(&self) -> Zeroizing<String> {
		Zeroizing::new(STANDARD.encode(self.material.as_slice()))
	}

	pub(crate) fn material(&self) -> &[u8; KEY_SIZE] {
		&self.material
	}
}

impl fmt::Debug for EncryptionKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EncryptionKey")
			.field("id", &self.id)
			.field("material", &"[REDACTED]")
			.finish()
	}
}

/// Load the process-wide key.
///
/// The environment variable wins over the file. Returns
/// [`CryptoError::KeySource`] when neither source is present.
pub fn load_key(env_var: &str, key_file: Option<&Path>, id: KeyId) -> CryptoResult<EncryptionKey> {
	if let Some(encoded) = std::env::var(env_var).ok().filter(|v| !v.trim().is_empty()) {
		debug!(env_var, key_id = id, "loading encryption key from environment");
		let encoded = Zeroizing::new(encoded);
		return EncryptionKey::from_base64(id, &encoded);
	}

	if let Some(path) = key_file {
		debug!(path = %path.display(), key_id = id, "loading encryption key from file");
		let content = Zeroizing::new(
			std::fs::read_to_string(path)
				.map_err(|e| CryptoError::KeySource(format!("{}: {e}", path.display())))?,
		);
		return EncryptionKey::from_base64(id, &content);
	}

	Err(CryptoError::KeySource(format!(
		"neither {env_var} nor a key file is configured"
	)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn rejects_wrong_length() {
		let err = EncryptionKey::from_bytes(1, &[1u8; 16]).unwrap_err();
		assert!(err.to_string().contains("expected 32 bytes"));
	}

	#[test]
	fn base64_roundtrip_padded_and_unpadded() {
		let key = EncryptionKey::generate(3);
		let padded = key.to_base64();
		let unpadded = padded.trim_end_matches('=').to_string();

		let a = EncryptionKey::from_base64(3, &padded).unwrap();
		let b = EncryptionKey::from_base64(3, &unpadded).unwrap();
		assert_eq!(a.material(), key.material());
		assert_eq!(b.material(), key.material());
	}

	#[test]
	fn debug_hides_material() {
		let key = EncryptionKey::from_bytes(1, &[0xAB; KEY_SIZE]).unwrap();
		let rendered = format!("{key:?}");
		assert!(rendered.contains("REDACTED"));
		assert!(!rendered.contains("171"));
	}

	#[test]
	fn loads_from_file_when_env_missing() {
		let key = EncryptionKey::generate(1);
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "{}", key.to_base64().as_str()).unwrap();

		let loaded = load_key(
			"STRONGBOX_TEST_KEY_THAT_IS_NEVER_SET",
			Some(file.path()),
			1,
		)
		.unwrap();
		assert_eq!(loaded.material(), key.material());
	}

	#[test]
	fn missing_sources_is_key_source_error() {
		let err = load_key("STRONGBOX_TEST_KEY_THAT_IS_NEVER_SET", None, 1).unwrap_err();
		assert!(matches!(err, CryptoError::KeySource(_)));
	}
}
