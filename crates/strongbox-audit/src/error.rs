// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type AuditResult<T> = Result<T, AuditError>;

#[derive(Error, Debug)]
pub enum AuditError {
	/// The ledger could not be written or read. Callers must not proceed
	/// with the action being audited.
	#[error("audit storage error: {0}")]
	Storage(#[from] sqlx::Error),

	#[error("audit detail serialization failed: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("unknown audit action: {0}")]
	UnknownAction(String),

	#[error("corrupt audit entry {id}: {reason}")]
	Corrupt { id: i64, reason: String },
}
