// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit entry types.
//!
//! - [`AuditAction`]: closed set of auditable actions
//! - [`AuditEntry`]: a persisted, immutable ledger row
//! - [`NewAuditEntry`]: builder for an entry not yet appended

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use strongbox_auth::ActorId;

use crate::error::AuditError;

/// Actor recorded for entries produced by background work.
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
	View,
	Create,
	Update,
	Delete,
	VerifySuccess,
	VerifyFailure,
	List,
	ExportAttempt,
	SettingsUpdate,
	AccessGranted,
	AccessRevoked,
	Logout,
	Cleanup,
}

impl AuditAction {
	pub const ALL: [AuditAction; 13] = [
		AuditAction::View,
		AuditAction::Create,
		AuditAction::Update,
		AuditAction::Delete,
		AuditAction::VerifySuccess,
		AuditAction::VerifyFailure,
		AuditAction::List,
		AuditAction::ExportAttempt,
		AuditAction::SettingsUpdate,
		AuditAction::AccessGranted,
		AuditAction::AccessRevoked,
		AuditAction::Logout,
		AuditAction::Cleanup,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			AuditAction::View => "view",
			AuditAction::Create => "create",
			AuditAction::Update => "update",
			AuditAction::Delete => "delete",
			AuditAction::VerifySuccess => "verify_success",
			AuditAction::VerifyFailure => "verify_failure",
			AuditAction::List => "list",
			AuditAction::ExportAttempt => "export_attempt",
			AuditAction::SettingsUpdate => "settings_update",
			AuditAction::AccessGranted => "access_granted",
			AuditAction::AccessRevoked => "access_revoked",
			AuditAction::Logout => "logout",
			AuditAction::Cleanup => "cleanup",
		}
	}

	/// Human-readable label for filter menus.
	pub fn label(&self) -> &'static str {
		match self {
			AuditAction::View => "Credential viewed",
			AuditAction::Create => "Credential created",
			AuditAction::Update => "Credential updated",
			AuditAction::Delete => "Credential deleted",
			AuditAction::VerifySuccess => "Password verified",
			AuditAction::VerifyFailure => "Password verification failed",
			AuditAction::List => "Credentials listed",
			AuditAction::ExportAttempt => "Export attempted",
			AuditAction::SettingsUpdate => "Settings changed",
			AuditAction::AccessGranted => "Access granted",
			AuditAction::AccessRevoked => "Access revoked",
			AuditAction::Logout => "Logged out",
			AuditAction::Cleanup => "Audit log cleanup",
		}
	}
}

/// Entry of the action catalogue served next to the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuditActionInfo {
	pub action: AuditAction,
	pub label: &'static str,
}

impl AuditActionInfo {
	pub fn all() -> Vec<AuditActionInfo> {
		AuditAction::ALL
			.into_iter()
			.map(|action| AuditActionInfo {
				action,
				label: action.label(),
			})
			.collect()
	}
}

impl fmt::Display for AuditAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AuditAction {
	type Err = AuditError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		AuditAction::ALL
			.into_iter()
			.find(|a| a.as_str() == s)
			.ok_or_else(|| AuditError::UnknownAction(s.to_string()))
	}
}

/// Whether the audited action went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
	Success,
	Failure,
}

impl AuditOutcome {
	pub fn as_str(&self) -> &'static str {
		match self {
			AuditOutcome::Success => "success",
			AuditOutcome::Failure => "failure",
		}
	}
}

/// One immutable ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
	/// Strictly increasing, never reused.
	pub id: i64,
	pub timestamp: DateTime<Utc>,
	pub actor: ActorId,
	pub action: AuditAction,
	pub target_id: Option<String>,
	/// Non-secret metadata. Always a JSON object.
	pub detail: Value,
}

impl AuditEntry {
	pub fn outcome(&self) -> AuditOutcome {
		match self.detail.get("outcome").and_then(Value::as_str) {
			Some("failure") => AuditOutcome::Failure,
			_ => AuditOutcome::Success,
		}
	}
}

/// An entry waiting to be appended. `id` and `timestamp` are assigned by
/// the log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
	pub actor: ActorId,
	pub action: AuditAction,
	pub target_id: Option<String>,
	pub detail: Map<String, Value>,
}

impl NewAuditEntry {
	pub fn new(action: AuditAction, actor: ActorId) -> Self {
		Self {
			actor,
			action,
			target_id: None,
			detail: Map::new(),
		}
	}

	/// Entry attributed to background work rather than a caller.
	pub fn system(action: AuditAction) -> Self {
		Self::new(action, ActorId::new(SYSTEM_ACTOR))
	}

	pub fn target(mut self, target_id: impl Into<String>) -> Self {
		self.target_id = Some(target_id.into());
		self
	}

	/// Attach a metadata field. Never pass secret values here.
	pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.detail.insert(key.into(), value.into());
		self
	}

	pub fn success(self) -> Self {
		self.detail("outcome", AuditOutcome::Success.as_str())
	}

	/// Mark the entry as a failed attempt, recording only the error kind.
	pub fn failure(self, error_kind: &str) -> Self {
		self
			.detail("outcome", AuditOutcome::Failure.as_str())
			.detail("error", error_kind)
	}
}
