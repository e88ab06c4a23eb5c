// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
	/// Wrong username or password. Deliberately does not say which.
	#[error("invalid credentials")]
	InvalidCredentials,

	#[error("unknown user: {0}")]
	UnknownUser(String),

	#[error("password hashing failed: {0}")]
	Hashing(String),

	#[error("identity provider error: {0}")]
	Provider(String),
}
