// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use strongbox_audit::AuditError;
use strongbox_auth::AuthError;
use strongbox_config::SettingsError;
use strongbox_crypto::CryptoError;
use strongbox_db::DbError;
use thiserror::Error;

pub type CredentialResult<T> = Result<T, CredentialError>;

/// Failures surfaced to callers. Messages never contain secret values.
#[derive(Debug, Error)]
pub enum CredentialError {
	/// Encryption is unavailable. Secret create, update and reveal are refused.
	#[error("encryption unavailable: {0}")]
	CryptoUnavailable(String),

	/// Stored ciphertext failed authentication.
	#[error("stored credential failed integrity check")]
	TamperDetected,

	#[error("{0}")]
	Validation(String),

	#[error("forbidden: {0}")]
	Forbidden(String),

	/// Step-up password was wrong. Does not say whether the account exists.
	#[error("password incorrect")]
	AuthFailed,

	#[error("not found: {0}")]
	NotFound(String),

	#[error("conflict: {0}")]
	Conflict(String),

	/// The audit ledger could not be written, so the action was not performed.
	#[error("audit log unavailable: {0}")]
	AuditUnavailable(String),

	/// A stored record could not be interpreted.
	#[error("corrupt credential record: {0}")]
	Corrupt(String),

	#[error("internal error: {0}")]
	Internal(String),
}

impl CredentialError {
	/// Stable machine-readable kind, recorded in audit entries and returned
	/// to API clients.
	pub fn kind(&self) -> &'static str {
		match self {
			CredentialError::CryptoUnavailable(_) => "crypto_unavailable",
			CredentialError::TamperDetected => "tamper_detected",
			CredentialError::Validation(_) => "validation_error",
			CredentialError::Forbidden(_) => "forbidden",
			CredentialError::AuthFailed => "auth_failed",
			CredentialError::NotFound(_) => "not_found",
			CredentialError::Conflict(_) => "conflict",
			CredentialError::AuditUnavailable(_) => "audit_unavailable",
			CredentialError::Corrupt(_) => "corrupt",
			CredentialError::Internal(_) => "internal",
		}
	}
}

impl From<CryptoError> for CredentialError {
	fn from(e: CryptoError) -> Self {
		match e {
			CryptoError::TamperDetected => CredentialError::TamperDetected,
			CryptoError::Unavailable(reason) => CredentialError::CryptoUnavailable(reason),
			other => CredentialError::CryptoUnavailable(other.to_string()),
		}
	}
}

impl From<AuditError> for CredentialError {
	fn from(e: AuditError) -> Self {
		CredentialError::AuditUnavailable(e.to_string())
	}
}

impl From<DbError> for CredentialError {
	fn from(e: DbError) -> Self {
		match e {
			DbError::NotFound(what) => CredentialError::NotFound(what),
			DbError::Conflict(what) => CredentialError::Conflict(what),
			other => CredentialError::Internal(other.to_string()),
		}
	}
}

impl From<sqlx::Error> for CredentialError {
	fn from(e: sqlx::Error) -> Self {
		CredentialError::Internal(format!("database error: {e}"))
	}
}

impl From<AuthError> for CredentialError {
	fn from(e: AuthError) -> Self {
		match e {
			AuthError::InvalidCredentials => CredentialError::AuthFailed,
			AuthError::UnknownUser(user) => CredentialError::NotFound(format!("user {user}")),
			other => CredentialError::Internal(other.to_string()),
		}
	}
}

impl From<SettingsError> for CredentialError {
	fn from(e: SettingsError) -> Self {
		match e {
			SettingsError::Invalid(msg) => CredentialError::Validation(msg),
			SettingsError::Unavailable(msg) => CredentialError::Internal(msg),
		}
	}
}
