// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core identity types.
//!
//! - [`ActorId`]: opaque identifier assigned by the identity provider
//! - [`SessionId`]: one interactive login session
//! - [`Identity`]: who the caller is
//! - [`ActorContext`]: identity plus the session the call arrived on
//! - [`Capability`]: named permission grants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of an actor as assigned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ActorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ActorId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

/// Unique identifier for an interactive session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
	pub fn new(id: Uuid) -> Self {
		Self(id)
	}

	/// Generate a new random ID.
	pub fn generate() -> Self {
		Self(Uuid::new_v4())
	}

	pub fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// The calling identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	pub id: ActorId,
	pub display_name: String,
	/// Platform administrators always hold every capability.
	pub is_admin: bool,
}

/// An identity bound to the session its request arrived on.
///
/// Step-up verification is scoped to `(identity.id, session_id)` and never
/// outlives `session_expires_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
	pub identity: Identity,
	pub session_id: SessionId,
	pub session_expires_at: DateTime<Utc>,
}

impl ActorContext {
	pub fn actor_id(&self) -> &ActorId {
		&self.identity.id
	}
}

/// Named permission grants checked against an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
	/// View, add, edit and delete stored credentials.
	ViewCredentials,
}

impl Capability {
	pub fn as_str(&self) -> &'static str {
		match self {
			Capability::ViewCredentials => "view_credentials",
		}
	}
}

impl fmt::Display for Capability {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
