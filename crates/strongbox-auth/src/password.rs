// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Argon2id password hashing for the local directory.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::{AuthError, AuthResult};

/// Argon2id, 19 MiB, 2 passes.
#[cfg(not(test))]
fn hasher() -> Argon2<'static> {
	Argon2::default()
}

/// Reduced cost for unit tests only.
#[cfg(test)]
fn hasher() -> Argon2<'static> {
	use argon2::{Algorithm, Params, Version};
	let params = Params::new(1024, 1, 1, None).expect("argon2 test params");
	Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Hash a password and return the PHC string (salt and parameters included).
pub fn hash_password(plaintext: &str) -> AuthResult<String> {
	let salt = SaltString::generate(&mut OsRng);
	hasher()
		.hash_password(plaintext.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Verify a password against a stored PHC string.
///
/// A malformed stored hash verifies as `false`; the parameters embedded in
/// the hash are honoured, so production hashes verify under test builds.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
	let Ok(parsed) = PasswordHash::new(stored_hash) else {
		return false;
	};
	hasher()
		.verify_password(plaintext.as_bytes(), &parsed)
		.is_ok()
}
