// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP error mapping.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::{Deserialize, Serialize};
use strongbox_credentials::CredentialError;
use strongbox_jobs::JobError;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
	#[error(transparent)]
	Credential(#[from] CredentialError),

	#[error("authentication required")]
	Unauthorized,

	#[error("invalid username or password")]
	InvalidLogin,

	#[error("{0}")]
	BadRequest(String),

	#[error(transparent)]
	Job(#[from] JobError),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
	pub fn status(&self) -> StatusCode {
		match self {
			ApiError::Credential(e) => credential_status(e),
			ApiError::Unauthorized | ApiError::InvalidLogin => StatusCode::UNAUTHORIZED,
			ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
			ApiError::Job(JobError::NotFound(_)) => StatusCode::NOT_FOUND,
			ApiError::Job(JobError::Cancelled) => StatusCode::CONFLICT,
			ApiError::Job(JobError::Failed { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub fn kind(&self) -> &'static str {
		match self {
			ApiError::Credential(e) => e.kind(),
			ApiError::Unauthorized => "unauthorized",
			ApiError::InvalidLogin => "invalid_credentials",
			ApiError::BadRequest(_) => "bad_request",
			ApiError::Job(JobError::NotFound(_)) => "not_found",
			ApiError::Job(JobError::Cancelled) => "job_cancelled",
			ApiError::Job(JobError::Failed { .. }) => "job_failed",
		}
	}

	/// Client-facing text. Storage and provider failures are reduced to a
	/// generic message; the detail goes to the log.
	fn public_message(&self) -> String {
		match self {
			ApiError::Credential(CredentialError::Internal(_)) => "internal server error".to_string(),
			ApiError::Credential(CredentialError::AuditUnavailable(_)) => {
				"the audit log is unavailable, the operation was not performed".to_string()
			}
			ApiError::Credential(CredentialError::Corrupt(_)) => {
				"the stored credential could not be read".to_string()
			}
			ApiError::Job(JobError::Failed { .. }) => "the job run failed".to_string(),
			other => other.to_string(),
		}
	}
}

fn credential_status(err: &CredentialError) -> StatusCode {
	match err {
		CredentialError::Validation(_) => StatusCode::BAD_REQUEST,
		CredentialError::AuthFailed => StatusCode::UNAUTHORIZED,
		CredentialError::Forbidden(_) => StatusCode::FORBIDDEN,
		CredentialError::NotFound(_) => StatusCode::NOT_FOUND,
		CredentialError::Conflict(_) => StatusCode::CONFLICT,
		CredentialError::TamperDetected => StatusCode::UNPROCESSABLE_ENTITY,
		CredentialError::CryptoUnavailable(_) | CredentialError::AuditUnavailable(_) => {
			StatusCode::SERVICE_UNAVAILABLE
		}
		CredentialError::Corrupt(_) | CredentialError::Internal(_) => {
			StatusCode::INTERNAL_SERVER_ERROR
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status();
		if status.is_server_error() {
			tracing::error!(error = %self, kind = self.kind(), "request failed");
		}
		let body = ErrorResponse {
			error: self.kind().to_string(),
			message: self.public_message(),
		};
		(status, Json(body)).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_mapping_follows_error_kind() {
		let cases = [
			(CredentialError::Validation("x".into()), StatusCode::BAD_REQUEST),
			(CredentialError::AuthFailed, StatusCode::UNAUTHORIZED),
			(CredentialError::Forbidden("x".into()), StatusCode::FORBIDDEN),
			(CredentialError::NotFound("x".into()), StatusCode::NOT_FOUND),
			(CredentialError::Conflict("x".into()), StatusCode::CONFLICT),
			(CredentialError::TamperDetected, StatusCode::UNPROCESSABLE_ENTITY),
			(
				CredentialError::CryptoUnavailable("x".into()),
				StatusCode::SERVICE_UNAVAILABLE,
			),
			(
				CredentialError::AuditUnavailable("x".into()),
				StatusCode::SERVICE_UNAVAILABLE,
			),
			(CredentialError::Corrupt("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
			(CredentialError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
		];
		for (err, status) in cases {
			assert_eq!(ApiError::from(err).status(), status);
		}
	}

	#[test]
	fn internal_detail_is_not_exposed() {
		let err = ApiError::from(CredentialError::Internal("database is locked at /var/db".into()));
		assert_eq!(err.public_message(), "internal server error");
		assert_eq!(err.kind(), "internal");
	}

	#[test]
	fn job_failures_hide_detail() {
		let err = ApiError::from(JobError::fatal("no such table: audit_entries"));
		assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(err.public_message(), "the job run failed");

		let err = ApiError::from(JobError::NotFound("nope".into()));
		assert_eq!(err.status(), StatusCode::NOT_FOUND);
		assert_eq!(err.kind(), "not_found");
	}
}
