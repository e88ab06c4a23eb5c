// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Input validation. Runs before any encryption or storage work.

use url::Url;

use crate::error::{CredentialError, CredentialResult};
use crate::types::CredentialPayload;

pub const MAX_LABEL_LEN: usize = 255;
pub const MAX_URL_LEN: usize = 2048;
pub const MAX_NOTES_LEN: usize = 65_535;

/// Trimmed, non-empty label.
pub fn validate_label(label: &str) -> CredentialResult<String> {
	let label = label.trim();
	if label.is_empty() {
		return Err(CredentialError::Validation("label is required".to_string()));
	}
	if label.chars().count() > MAX_LABEL_LEN {
		return Err(CredentialError::Validation(format!(
			"label must be at most {MAX_LABEL_LEN} characters"
		)));
	}
	Ok(label.to_string())
}

/// `None` for blank input.
pub fn validate_url(url: Option<&str>) -> CredentialResult<Option<String>> {
	let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
		return Ok(None);
	};
	if url.len() > MAX_URL_LEN {
		return Err(CredentialError::Validation(format!(
			"url must be at most {MAX_URL_LEN} characters"
		)));
	}
	let parsed =
		Url::parse(url).map_err(|e| CredentialError::Validation(format!("invalid url: {e}")))?;
	match parsed.scheme() {
		"http" | "https" => Ok(Some(url.to_string())),
		scheme => Err(CredentialError::Validation(format!(
			"url scheme '{scheme}' is not allowed, use http or https"
		))),
	}
}

/// `None` for blank input.
pub fn validate_notes(notes: Option<&str>) -> CredentialResult<Option<String>> {
	let Some(notes) = notes.filter(|n| !n.trim().is_empty()) else {
		return Ok(None);
	};
	if notes.len() > MAX_NOTES_LEN {
		return Err(CredentialError::Validation(format!(
			"notes must be at most {MAX_NOTES_LEN} bytes"
		)));
	}
	Ok(Some(notes.to_string()))
}

/// Required-field rules per kind.
pub fn validate_payload(payload: &CredentialPayload) -> CredentialResult<()> {
	let missing = match payload {
		CredentialPayload::UsernamePassword { username, password } => {
			(username.is_empty() && password.is_empty()).then_some("username or password")
		}
		CredentialPayload::ApiKey { api_key } => api_key.is_empty().then_some("api_key"),
		CredentialPayload::SshKey { ssh_key } => ssh_key.is_empty().then_some("ssh_key"),
		CredentialPayload::SecureNote { secure_note } => {
			secure_note.is_empty().then_some("secure_note")
		}
	};
	match missing {
		Some(field) => Err(CredentialError::Validation(format!(
			"{field} is required for type '{}'",
			payload.kind()
		))),
		None => Ok(()),
	}
}
