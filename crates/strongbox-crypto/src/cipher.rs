// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! AES-256-GCM sealing with detached nonce and tag.
//!
//! The persisted blob layout is `nonce || ciphertext || tag`. The key
//! identifier travels beside the blob, never inside it.

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng, Payload},
	Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::key::KeyId;

/// Size of encryption keys in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Sealed payload: nonce, ciphertext body and authentication tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
	/// Identifier of the key that sealed this payload. Reserved for rotation.
	pub key_id: KeyId,
	pub nonce: [u8; NONCE_SIZE],
	pub bytes: Vec<u8>,
	pub tag: [u8; TAG_SIZE],
}

impl Ciphertext {
	/// Serialize as `nonce || ciphertext || tag`.
	pub fn to_blob(&self) -> Vec<u8> {
		let mut blob = Vec::with_capacity(NONCE_SIZE + self.bytes.len() + TAG_SIZE);
		blob.extend_from_slice(&self.nonce);
		blob.extend_from_slice(&self.bytes);
		blob.extend_from_slice(&self.tag);
		blob
	}

	/// Parse a persisted blob. A blob too short to hold a nonce and tag can
	/// only be the result of corruption, so it is reported as tampering.
	pub fn from_blob(key_id: KeyId, blob: &[u8]) -> CryptoResult<Self> {
		if blob.len() < NONCE_SIZE + TAG_SIZE {
			return Err(CryptoError::TamperDetected);
		}

		let (nonce_bytes, rest) = blob.split_at(NONCE_SIZE);
		let (body, tag_bytes) = rest.split_at(rest.len() - TAG_SIZE);

		let mut nonce = [0u8; NONCE_SIZE];
		nonce.copy_from_slice(nonce_bytes);
		let mut tag = [0u8; TAG_SIZE];
		tag.copy_from_slice(tag_bytes);

		Ok(Self {
			key_id,
			nonce,
			bytes: body.to_vec(),
			tag,
		})
	}
}

/// Generate a random nonce.
///
/// 96-bit random nonces from OsRng. The same (key, nonce) pair must never be
/// reused; at the volumes a credential store sees the collision probability
/// is negligible.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
	let mut nonce = [0u8; NONCE_SIZE];
	OsRng.fill_bytes(&mut nonce);
	nonce
}

/// Seal `plaintext` under `key`, binding `aad` into the tag.
pub(crate) fn seal(
	key_id: KeyId,
	key: &[u8; KEY_SIZE],
	plaintext: &[u8],
	aad: &[u8],
) -> CryptoResult<Ciphertext> {
	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

	let nonce_bytes = generate_nonce();
	let nonce = Nonce::from_slice(&nonce_bytes);

	let mut sealed = cipher
		.encrypt(
			nonce,
			Payload {
				msg: plaintext,
				aad,
			},
		)
		.map_err(|e| CryptoError::Unavailable(format!("payload encryption failed: {e}")))?;

	if sealed.len() < TAG_SIZE {
		return Err(CryptoError::Unavailable(
			"ciphertext shorter than authentication tag".to_string(),
		));
	}
	let tag_bytes = sealed.split_off(sealed.len() - TAG_SIZE);
	let mut tag = [0u8; TAG_SIZE];
	tag.copy_from_slice(&tag_bytes);

	Ok(Ciphertext {
		key_id,
		nonce: nonce_bytes,
		bytes: sealed,
		tag,
	})
}

/// Open a sealed payload. The tag is verified before any plaintext exists.
pub(crate) fn open(
	key: &[u8; KEY_SIZE],
	ciphertext: &Ciphertext,
	aad: &[u8],
) -> CryptoResult<Zeroizing<Vec<u8>>> {
	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
	let nonce = Nonce::from_slice(&ciphertext.nonce);

	let mut combined = Vec::with_capacity(ciphertext.bytes.len() + TAG_SIZE);
	combined.extend_from_slice(&ciphertext.bytes);
	combined.extend_from_slice(&ciphertext.tag);

	let plaintext = cipher
		.decrypt(
			nonce,
			Payload {
				msg: &combined,
				aad,
			},
		)
		.map_err(|_| CryptoError::TamperDetected)?;

	Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	const KEY: [u8; KEY_SIZE] = [7u8; KEY_SIZE];

	#[test]
	fn blob_roundtrip_preserves_layout() {
		let sealed = seal(1, &KEY, b"payload", b"").unwrap();
		let blob = sealed.to_blob();

		assert_eq!(&blob[..NONCE_SIZE], &sealed.nonce);
		assert_eq!(&blob[blob.len() - TAG_SIZE..], &sealed.tag);
		assert_eq!(Ciphertext::from_blob(1, &blob).unwrap(), sealed);
	}

	#[test]
	fn short_blob_is_tamper() {
		let err = Ciphertext::from_blob(1, &[0u8; NONCE_SIZE + TAG_SIZE - 1]).unwrap_err();
		assert!(matches!(err, CryptoError::TamperDetected));
	}

	#[test]
	fn empty_plaintext_seals_to_tag_only() {
		let sealed = seal(1, &KEY, b"", b"").unwrap();
		assert!(sealed.bytes.is_empty());
		assert!(open(&KEY, &sealed, b"").unwrap().is_empty());
	}

	#[test]
	fn mismatched_aad_fails() {
		let sealed = seal(1, &KEY, b"secret", b"record-a").unwrap();
		let err = open(&KEY, &sealed, b"record-b").unwrap_err();
		assert!(matches!(err, CryptoError::TamperDetected));
	}

	proptest! {
		#[test]
		fn prop_nonces_are_fresh(plaintext in proptest::collection::vec(any::<u8>(), 1..256)) {
			let a = seal(1, &KEY, &plaintext, b"").unwrap();
			let b = seal(1, &KEY, &plaintext, b"").unwrap();
			prop_assert_ne!(a.nonce, b.nonce);
			prop_assert_ne!(a.bytes, b.bytes);
		}
	}
}
