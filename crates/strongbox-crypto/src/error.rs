// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
	/// No usable key, or the cipher failed its self-test.
	#[error("encryption unavailable: {0}")]
	Unavailable(String),

	/// Authentication tag did not verify. No plaintext is returned.
	#[error("ciphertext failed authentication")]
	TamperDetected,

	#[error("invalid key: {0}")]
	InvalidKey(String),

	#[error("key source unreadable: {0}")]
	KeySource(String),
}
