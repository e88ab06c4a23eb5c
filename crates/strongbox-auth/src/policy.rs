// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Seams to the host platform's identity system.

use async_trait::async_trait;
use serde::Serialize;
use strongbox_common_secret::SecretString;

use crate::error::AuthResult;
use crate::types::{ActorContext, ActorId, Capability, Identity};

/// Capability predicate backed by whatever identity system is deployed.
#[async_trait]
pub trait AuthorizationPolicy: Send + Sync {
	async fn actor_has_capability(
		&self,
		actor: &Identity,
		capability: Capability,
	) -> AuthResult<bool>;
}

/// Resolves callers and checks their own account password.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
	/// Resolve the actor behind a session token. `None` for unknown or
	/// expired sessions.
	async fn current_actor(&self, session_token: &SecretString) -> AuthResult<Option<ActorContext>>;

	/// Check `secret` against the actor's own login credential.
	async fn verify_actor_password(
		&self,
		actor: &Identity,
		secret: &SecretString,
	) -> AuthResult<bool>;
}

/// One row of the access management view.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AccessEntry {
	pub actor_id: ActorId,
	pub display_name: String,
	pub is_admin: bool,
	/// Effective access: administrators always have it.
	pub has_access: bool,
}

/// Directory that can grant and revoke capabilities for non-admin users.
#[async_trait]
pub trait AccessDirectory: Send + Sync {
	async fn grant(&self, user: &ActorId, capability: Capability) -> AuthResult<()>;

	async fn revoke(&self, user: &ActorId, capability: Capability) -> AuthResult<()>;

	async fn list_access(&self, capability: Capability) -> AuthResult<Vec<AccessEntry>>;
}

/// Durable record of explicit capability grants. The directory overlays it
/// on the configured users so grants and revocations survive a restart.
#[async_trait]
pub trait GrantStore: Send + Sync {
	/// Every stored decision for `capability`, granted or revoked.
	async fn load_grants(&self, capability: Capability) -> AuthResult<Vec<(ActorId, bool)>>;

	async fn store_grant(
		&self,
		user: &ActorId,
		capability: Capability,
		granted: bool,
	) -> AuthResult<()>;
}
