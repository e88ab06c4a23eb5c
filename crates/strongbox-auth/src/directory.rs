// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process user directory.
//!
//! Users come from configuration with pre-hashed (argon2id PHC) passwords.
//! Session tokens are 32 random bytes, hex encoded; only their SHA-256 digest
//! is kept in memory.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::RngCore;
use sha2::{Digest, Sha256};
use strongbox_common_secret::SecretString;
use tracing::{debug, info, instrument, warn};

use crate::error::{AuthError, AuthResult};
use crate::password::verify_password;
use crate::policy::{
	AccessDirectory, AccessEntry, AuthorizationPolicy, GrantStore, IdentityProvider,
};
use crate::types::{ActorContext, ActorId, Capability, Identity, SessionId};

const SESSION_TOKEN_BYTES: usize = 32;

/// A user known to the local directory.
#[derive(Debug, Clone)]
pub struct DirectoryUser {
	pub username: String,
	pub display_name: String,
	/// Argon2id PHC string.
	pub password_hash: String,
	pub is_admin: bool,
	/// Explicit grant of the credentials capability. Ignored for admins.
	pub credentials_access: bool,
}

impl DirectoryUser {
	fn identity(&self) -> Identity {
		Identity {
			id: ActorId::new(&self.username),
			display_name: self.display_name.clone(),
			is_admin: self.is_admin,
		}
	}
}

/// Result of a successful login. The token is only ever shown here.
#[derive(Debug)]
pub struct LoginSession {
	pub token: SecretString,
	pub context: ActorContext,
}

pub struct LocalDirectory {
	users: DashMap<ActorId, DirectoryUser>,
	/// sha256(token) hex -> session
	sessions: DashMap<String, ActorContext>,
	session_lifetime: Duration,
	grants: Option<Arc<dyn GrantStore>>,
}

impl fmt::Debug for LocalDirectory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LocalDirectory")
			.field("users", &self.users.len())
			.field("sessions", &self.sessions.len())
			.field("session_lifetime", &self.session_lifetime)
			.field("durable_grants", &self.grants.is_some())
			.finish()
	}
}

impl LocalDirectory {
	pub fn new(users: impl IntoIterator<Item = DirectoryUser>, session_lifetime: Duration) -> Self {
		let users: DashMap<ActorId, DirectoryUser> = users
			.into_iter()
			.map(|u| (ActorId::new(&u.username), u))
			.collect();
		info!(users = users.len(), "local directory loaded");
		Self {
			users,
			sessions: DashMap::new(),
			session_lifetime,
			grants: None,
		}
	}

	/// Persist grant and revoke decisions to `store`. Call
	/// [`load_grants`](Self::load_grants) afterwards to apply earlier ones.
	pub fn with_grant_store(mut self, store: Arc<dyn GrantStore>) -> Self {
		self.grants = Some(store);
		self
	}

	/// Overlay stored decisions on the configured users. Decisions for users
	/// that are no longer configured are skipped. Returns how many applied.
	#[instrument(skip(self))]
	pub async fn load_grants(&self) -> AuthResult<usize> {
		let Some(store) = &self.grants else {
			return Ok(0);
		};

		let mut applied = 0;
		for (user, granted) in store.load_grants(Capability::ViewCredentials).await? {
			match self.users.get_mut(&user) {
				Some(mut entry) => {
					entry.credentials_access = granted;
					applied += 1;
				}
				None => debug!(%user, "stored grant for unknown user ignored"),
			}
		}
		info!(applied, "stored capability grants loaded");
		Ok(applied)
	}

	async fn set_capability(
		&self,
		user: &ActorId,
		capability: Capability,
		granted: bool,
	) -> AuthResult<()> {
		if !self.users.contains_key(user) {
			return Err(AuthError::UnknownUser(user.to_string()));
		}
		if let Some(store) = &self.grants {
			store.store_grant(user, capability, granted).await?;
		}

		let mut entry = self
			.users
			.get_mut(user)
			.ok_or_else(|| AuthError::UnknownUser(user.to_string()))?;
		match capability {
			Capability::ViewCredentials => entry.credentials_access = granted,
		}
		Ok(())
	}

	pub fn session_lifetime(&self) -> Duration {
		self.session_lifetime
	}

	/// Start an interactive session. Unknown user and wrong password are
	/// indistinguishable to the caller.
	#[instrument(skip(self, password))]
	pub async fn login(&self, username: &str, password: &SecretString) -> AuthResult<LoginSession> {
		self.login_at(username, password, Utc::now()).await
	}

	pub async fn login_at(
		&self,
		username: &str,
		password: &SecretString,
		now: DateTime<Utc>,
	) -> AuthResult<LoginSession> {
		let Some(user) = self
			.users
			.get(&ActorId::new(username))
			.map(|u| u.value().clone())
		else {
			debug!(username, "login for unknown user");
			return Err(AuthError::InvalidCredentials);
		};

		if !check_password(password, &user.password_hash).await? {
			warn!(username, "login failed");
			return Err(AuthError::InvalidCredentials);
		}

		let mut raw = [0u8; SESSION_TOKEN_BYTES];
		rand::thread_rng().fill_bytes(&mut raw);
		let token = SecretString::new(hex::encode(raw));

		let context = ActorContext {
			identity: user.identity(),
			session_id: SessionId::generate(),
			session_expires_at: now + self.session_lifetime,
		};
		self
			.sessions
			.insert(token_digest(&token), context.clone());

		info!(username, session_id = %context.session_id, "session started");
		Ok(LoginSession { token, context })
	}

	/// End a session. Returns the context it belonged to, if any.
	#[instrument(skip_all)]
	pub fn logout(&self, token: &SecretString) -> Option<ActorContext> {
		let (_, context) = self.sessions.remove(&token_digest(token))?;
		info!(actor = %context.identity.id, session_id = %context.session_id, "session ended");
		Some(context)
	}

	pub fn resolve_at(&self, token: &SecretString, now: DateTime<Utc>) -> Option<ActorContext> {
		let digest = token_digest(token);
		let context = self.sessions.get(&digest)?.value().clone();
		if now >= context.session_expires_at {
			self.sessions.remove(&digest);
			debug!(actor = %context.identity.id, "session expired");
			return None;
		}

		// Admin flag and display name may have changed since login.
		let identity = self.users.get(&context.identity.id)?.identity();
		Some(ActorContext {
			identity,
			..context
		})
	}

	/// Drop every session that has expired by `now`. Returns how many were
	/// removed.
	pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
		let before = self.sessions.len();
		self
			.sessions
			.retain(|_, context| now < context.session_expires_at);
		let removed = before.saturating_sub(self.sessions.len());
		if removed > 0 {
			debug!(removed, "expired sessions pruned");
		}
		removed
	}

	pub fn active_sessions(&self) -> usize {
		self.sessions.len()
	}

	fn user(&self, id: &ActorId) -> AuthResult<DirectoryUser> {
		self
			.users
			.get(id)
			.map(|u| u.value().clone())
			.ok_or_else(|| AuthError::UnknownUser(id.to_string()))
	}
}

fn token_digest(token: &SecretString) -> String {
	hex::encode(Sha256::digest(token.expose().as_bytes()))
}

async fn check_password(password: &SecretString, stored_hash: &str) -> AuthResult<bool> {
	let password = password.clone();
	let stored_hash = stored_hash.to_string();
	tokio::task::spawn_blocking(move || verify_password(password.expose(), &stored_hash))
		.await
		.map_err(|e| AuthError::Hashing(format!("verification task failed: {e}")))
}

#[async_trait]
impl AuthorizationPolicy for LocalDirectory {
	async fn actor_has_capability(
		&self,
		actor: &Identity,
		capability: Capability,
	) -> AuthResult<bool> {
		let Some(user) = self.users.get(&actor.id) else {
			return Ok(false);
		};
		Ok(match capability {
			Capability::ViewCredentials => user.is_admin || user.credentials_access,
		})
	}
}

#[async_trait]
impl IdentityProvider for LocalDirectory {
	async fn current_actor(&self, session_token: &SecretString) -> AuthResult<Option<ActorContext>> {
		Ok(self.resolve_at(session_token, Utc::now()))
	}

	async fn verify_actor_password(
		&self,
		actor: &Identity,
		secret: &SecretString,
	) -> AuthResult<bool> {
		let user = self.user(&actor.id)?;
		check_password(secret, &user.password_hash).await
	}
}

#[async_trait]
impl AccessDirectory for LocalDirectory {
	async fn grant(&self, user: &ActorId, capability: Capability) -> AuthResult<()> {
		self.set_capability(user, capability, true).await?;
		info!(%user, %capability, "capability granted");
		Ok(())
	}

	async fn revoke(&self, user: &ActorId, capability: Capability) -> AuthResult<()> {
		self.set_capability(user, capability, false).await?;
		info!(%user, %capability, "capability revoked");
		Ok(())
	}

	async fn list_access(&self, capability: Capability) -> AuthResult<Vec<AccessEntry>> {
		let mut entries: Vec<AccessEntry> = self
			.users
			.iter()
			.map(|u| {
				let granted = match capability {
					Capability::ViewCredentials => u.credentials_access,
				};
				AccessEntry {
					actor_id: u.key().clone(),
					display_name: u.display_name.clone(),
					is_admin: u.is_admin,
					has_access: u.is_admin || granted,
				}
			})
			.collect();
		entries.sort_by(|a, b| a.actor_id.cmp(&b.actor_id));
		Ok(entries)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::password::hash_password;

	fn user(name: &str, password: &str, is_admin: bool, access: bool) -> DirectoryUser {
		DirectoryUser {
			username: name.to_string(),
			display_name: name.to_uppercase(),
			password_hash: hash_password(password).unwrap(),
			is_admin,
			credentials_access: access,
		}
	}

	fn directory() -> LocalDirectory {
		LocalDirectory::new(
			[
				user("admin", "admin-pw", true, false),
				user("alice", "alice-pw", false, true),
				user("bob", "bob-pw", false, false),
			],
			Duration::hours(8),
		)
	}

	fn secret(s: &str) -> SecretString {
		SecretString::from(s)
	}

	#[tokio::test]
	async fn login_and_resolve() {
		let dir = directory();
		let session = dir.login("alice", &secret("alice-pw")).await.unwrap();
		assert_eq!(session.token.expose().len(), SESSION_TOKEN_BYTES * 2);

		let ctx = dir.current_actor(&session.token).await.unwrap().unwrap();
		assert_eq!(ctx.identity.id, ActorId::new("alice"));
		assert_eq!(ctx.session_id, session.context.session_id);
	}

	#[tokio::test]
	async fn bad_password_and_unknown_user_look_the_same() {
		let dir = directory();
		let wrong = dir.login("alice", &secret("nope")).await.unwrap_err();
		let unknown = dir.login("mallory", &secret("nope")).await.unwrap_err();
		assert_eq!(wrong.to_string(), unknown.to_string());
		assert!(matches!(wrong, AuthError::InvalidCredentials));
	}

	#[tokio::test]
	async fn unknown_token_resolves_to_none() {
		let dir = directory();
		assert!(dir.current_actor(&secret("deadbeef")).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn expired_session_resolves_to_none() {
		let dir = directory();
		let start = Utc::now();
		let session = dir.login_at("alice", &secret("alice-pw"), start).await.unwrap();

		assert!(dir.resolve_at(&session.token, start + Duration::hours(7)).is_some());
		assert!(dir.resolve_at(&session.token, start + Duration::hours(8)).is_none());
		assert!(dir.resolve_at(&session.token, start).is_none());
	}

	#[tokio::test]
	async fn prune_drops_only_expired_sessions() {
		let dir = directory();
		let now = Utc::now();
		for _ in 0..5 {
			dir.login_at("bob", &secret("bob-pw"), now - Duration::days(1))
				.await
				.unwrap();
		}
		let live = dir.login_at("alice", &secret("alice-pw"), now).await.unwrap();
		assert_eq!(dir.active_sessions(), 6);

		assert_eq!(dir.prune_expired(now), 5);
		assert_eq!(dir.active_sessions(), 1);
		assert!(dir.resolve_at(&live.token, now).is_some());
		assert_eq!(dir.prune_expired(now), 0);
	}

	#[tokio::test]
	async fn logout_ends_session() {
		let dir = directory();
		let session = dir.login("bob", &secret("bob-pw")).await.unwrap();
		let ended = dir.logout(&session.token).unwrap();
		assert_eq!(ended.identity.id, ActorId::new("bob"));
		assert!(dir.current_actor(&session.token).await.unwrap().is_none());
		assert!(dir.logout(&session.token).is_none());
	}

	#[tokio::test]
	async fn verify_actor_password_checks_own_password() {
		let dir = directory();
		let alice = dir.user(&ActorId::new("alice")).unwrap().identity();
		assert!(dir.verify_actor_password(&alice, &secret("alice-pw")).await.unwrap());
		assert!(!dir.verify_actor_password(&alice, &secret("bob-pw")).await.unwrap());
	}

	#[tokio::test]
	async fn admins_always_have_capability() {
		let dir = directory();
		let admin = dir.user(&ActorId::new("admin")).unwrap().identity();
		assert!(dir
			.actor_has_capability(&admin, Capability::ViewCredentials)
			.await
			.unwrap());

		dir.revoke(&admin.id, Capability::ViewCredentials).await.unwrap();
		assert!(dir
			.actor_has_capability(&admin, Capability::ViewCredentials)
			.await
			.unwrap());
	}

	#[tokio::test]
	async fn grant_and_revoke_for_regular_users() {
		let dir = directory();
		let bob = dir.user(&ActorId::new("bob")).unwrap().identity();
		assert!(!dir.actor_has_capability(&bob, Capability::ViewCredentials).await.unwrap());

		dir.grant(&bob.id, Capability::ViewCredentials).await.unwrap();
		assert!(dir.actor_has_capability(&bob, Capability::ViewCredentials).await.unwrap());

		dir.revoke(&bob.id, Capability::ViewCredentials).await.unwrap();
		assert!(!dir.actor_has_capability(&bob, Capability::ViewCredentials).await.unwrap());
	}

	#[tokio::test]
	async fn grant_unknown_user_fails() {
		let dir = directory();
		let err = dir
			.grant(&ActorId::new("mallory"), Capability::ViewCredentials)
			.await
			.unwrap_err();
		assert!(matches!(err, AuthError::UnknownUser(_)));
	}

	#[derive(Default)]
	struct MemoryGrants {
		stored: DashMap<ActorId, bool>,
		fail: bool,
	}

	#[async_trait]
	impl GrantStore for MemoryGrants {
		async fn load_grants(&self, _capability: Capability) -> AuthResult<Vec<(ActorId, bool)>> {
			Ok(self
				.stored
				.iter()
				.map(|e| (e.key().clone(), *e.value()))
				.collect())
		}

		async fn store_grant(
			&self,
			user: &ActorId,
			_capability: Capability,
			granted: bool,
		) -> AuthResult<()> {
			if self.fail {
				return Err(AuthError::Provider("grant store offline".to_string()));
			}
			self.stored.insert(user.clone(), granted);
			Ok(())
		}
	}

	#[tokio::test]
	async fn stored_grants_outlive_the_directory() {
		let store = Arc::new(MemoryGrants::default());
		let dir = directory().with_grant_store(store.clone());
		dir.grant(&ActorId::new("bob"), Capability::ViewCredentials)
			.await
			.unwrap();
		dir.revoke(&ActorId::new("alice"), Capability::ViewCredentials)
			.await
			.unwrap();

		let restarted = directory().with_grant_store(store);
		assert_eq!(restarted.load_grants().await.unwrap(), 2);
		let bob = restarted.user(&ActorId::new("bob")).unwrap().identity();
		let alice = restarted.user(&ActorId::new("alice")).unwrap().identity();
		assert!(restarted
			.actor_has_capability(&bob, Capability::ViewCredentials)
			.await
			.unwrap());
		assert!(!restarted
			.actor_has_capability(&alice, Capability::ViewCredentials)
			.await
			.unwrap());
	}

	#[tokio::test]
	async fn failed_store_leaves_grant_unchanged() {
		let store = Arc::new(MemoryGrants {
			fail: true,
			..Default::default()
		});
		let dir = directory().with_grant_store(store);
		let bob = ActorId::new("bob");
		assert!(dir.grant(&bob, Capability::ViewCredentials).await.is_err());

		let bob = dir.user(&bob).unwrap().identity();
		assert!(!dir.actor_has_capability(&bob, Capability::ViewCredentials).await.unwrap());
	}

	#[tokio::test]
	async fn list_access_is_sorted_and_effective() {
		let dir = directory();
		let entries = dir.list_access(Capability::ViewCredentials).await.unwrap();
		let summary: Vec<(&str, bool)> = entries
			.iter()
			.map(|e| (e.actor_id.as_str(), e.has_access))
			.collect();
		assert_eq!(summary, vec![("admin", true), ("alice", true), ("bob", false)]);
	}
}
