// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tracing::{error, instrument};
use zeroize::Zeroizing;

use crate::cipher::{self, Ciphertext};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{EncryptionKey, KeyId};

const SELF_TEST_PLAINTEXT: &[u8] = b"strongbox-self-test";

/// Process-wide encryption service.
///
/// Constructed once at startup and shared by reference. A service without a
/// key (or whose cipher failed the startup self-test) is in degraded mode:
/// [`is_available`](Self::is_available) is false and every encrypt/decrypt
/// returns [`CryptoError::Unavailable`].
#[derive(Debug)]
pub struct EncryptionService {
	key: Option<EncryptionKey>,
	unavailable_reason: Option<String>,
}

impl EncryptionService {
	pub fn new(key: EncryptionKey) -> Self {
		match self_test(&key) {
			Ok(()) => Self {
				key: Some(key),
				unavailable_reason: None,
			},
			Err(e) => {
				error!(error = %e, "encryption self-test failed, entering degraded mode");
				Self::unavailable(format!("self-test failed: {e}"))
			}
		}
	}

	/// A service with no key. All secret operations fail closed.
	pub fn unavailable(reason: impl Into<String>) -> Self {
		Self {
			key: None,
			unavailable_reason: Some(reason.into()),
		}
	}

	pub fn is_available(&self) -> bool {
		self.key.is_some()
	}

	/// Why the service is degraded, if it is.
	pub fn unavailable_reason(&self) -> Option<&str> {
		self.unavailable_reason.as_deref()
	}

	/// Identifier of the active key.
	pub fn key_id(&self) -> Option<KeyId> {
		self.key.as_ref().map(EncryptionKey::id)
	}

	/// Encrypt with a fresh random nonce. `associated_data` is authenticated
	/// but not encrypted.
	#[instrument(skip_all, fields(len = plaintext.len()))]
	pub fn encrypt(
		&self,
		plaintext: &[u8],
		associated_data: Option<&[u8]>,
	) -> CryptoResult<Ciphertext> {
		let key = self.active_key()?;
		cipher::seal(
			key.id(),
			key.material(),
			plaintext,
			associated_data.unwrap_or_default(),
		)
	}

	/// Decrypt and verify. Any corruption of key id, nonce, body, tag or
	/// associated data yields [`CryptoError::TamperDetected`] and no plaintext.
	#[instrument(skip_all, fields(key_id = ciphertext.key_id))]
	pub fn decrypt(
		&self,
		ciphertext: &Ciphertext,
		associated_data: Option<&[u8]>,
	) -> CryptoResult<Zeroizing<Vec<u8>>> {
		let key = self.active_key()?;
		// Only one key is ever loaded, so a foreign key id is a rewritten record.
		if ciphertext.key_id != key.id() {
			error!(
				key_id = ciphertext.key_id,
				active_key_id = key.id(),
				"ciphertext names a key that is not loaded"
			);
			return Err(CryptoError::TamperDetected);
		}
		cipher::open(
			key.material(),
			ciphertext,
			associated_data.unwrap_or_default(),
		)
	}

	fn active_key(&self) -> CryptoResult<&EncryptionKey> {
		self.key.as_ref().ok_or_else(|| {
			CryptoError::Unavailable(
				self
					.unavailable_reason
					.clone()
					.unwrap_or_else(|| "no encryption key loaded".to_string()),
			)
		})
	}
}

fn self_test(key: &EncryptionKey) -> CryptoResult<()> {
	let sealed = cipher::seal(key.id(), key.material(), SELF_TEST_PLAINTEXT, &[])?;
	let opened = cipher::open(key.material(), &sealed, &[])?;
	if opened.as_slice() != SELF_TEST_PLAINTEXT {
		return Err(CryptoError::Unavailable(
			"self-test round trip mismatch".to_string(),
		));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cipher::{NONCE_SIZE, TAG_SIZE};
	use proptest::prelude::*;

	fn service() -> EncryptionService {
		EncryptionService::new(EncryptionKey::generate(1))
	}

	#[test]
	fn available_with_key() {
		let svc = service();
		assert!(svc.is_available());
		assert_eq!(svc.key_id(), Some(1));
		assert!(svc.unavailable_reason().is_none());
	}

	#[test]
	fn unavailable_fails_closed() {
		let svc = EncryptionService::unavailable("no key configured");
		assert!(!svc.is_available());

		let err = svc.encrypt(b"secret", None).unwrap_err();
		assert!(matches!(err, CryptoError::Unavailable(_)));
		assert!(err.to_string().contains("no key configured"));

		let sealed = service().encrypt(b"secret", None).unwrap();
		let err = svc.decrypt(&sealed, None).unwrap_err();
		assert!(matches!(err, CryptoError::Unavailable(_)));
	}

	#[test]
	fn wrong_key_is_tamper() {
		let sealed = service().encrypt(b"secret", None).unwrap();
		let err = service().decrypt(&sealed, None).unwrap_err();
		assert!(matches!(err, CryptoError::TamperDetected));
	}

	#[test]
	fn unknown_key_id_is_tamper() {
		let svc = service();
		let mut sealed = svc.encrypt(b"secret", None).unwrap();
		sealed.key_id = 9;
		let err = svc.decrypt(&sealed, None).unwrap_err();
		assert!(matches!(err, CryptoError::TamperDetected));
	}

	#[test]
	fn associated_data_is_bound() {
		let svc = service();
		let sealed = svc.encrypt(b"secret", Some(b"credential-1")).unwrap();
		assert!(svc.decrypt(&sealed, Some(b"credential-1")).is_ok());
		assert!(matches!(
			svc.decrypt(&sealed, Some(b"credential-2")).unwrap_err(),
			CryptoError::TamperDetected
		));
		assert!(matches!(
			svc.decrypt(&sealed, None).unwrap_err(),
			CryptoError::TamperDetected
		));
	}

	proptest! {
		#[test]
		fn prop_decrypt_inverts_encrypt(plaintext in proptest::collection::vec(any::<u8>(), 0..4096)) {
			let svc = service();
			let sealed = svc.encrypt(&plaintext, None).unwrap();
			let opened = svc.decrypt(&sealed, None).unwrap();
			prop_assert_eq!(plaintext.as_slice(), opened.as_slice());
		}

		#[test]
		fn prop_single_bit_flip_in_blob_is_detected(
			plaintext in proptest::collection::vec(any::<u8>(), 1..512),
			position in any::<usize>(),
			bit in 0u8..8,
		) {
			let svc = service();
			let sealed = svc.encrypt(&plaintext, Some(b"aad")).unwrap();
			let mut blob = sealed.to_blob();
			let idx = position % blob.len();
			blob[idx] ^= 1 << bit;

			let tampered = Ciphertext::from_blob(sealed.key_id, &blob).unwrap();
			let result = svc.decrypt(&tampered, Some(b"aad"));
			prop_assert!(matches!(result, Err(CryptoError::TamperDetected)));
		}

		#[test]
		fn prop_tag_and_nonce_flips_are_detected(
			plaintext in proptest::collection::vec(any::<u8>(), 0..256),
			tag_idx in 0usize..TAG_SIZE,
			nonce_idx in 0usize..NONCE_SIZE,
		) {
			let svc = service();
			let sealed = svc.encrypt(&plaintext, None).unwrap();

			let mut bad_tag = sealed.clone();
			bad_tag.tag[tag_idx] ^= 0x01;
			prop_assert!(matches!(svc.decrypt(&bad_tag, None), Err(CryptoError::TamperDetected)));

			let mut bad_nonce = sealed;
			bad_nonce.nonce[nonce_idx] ^= 0x80;
			prop_assert!(matches!(svc.decrypt(&bad_nonce, None), Err(CryptoError::TamperDetected)));
		}
	}
}
