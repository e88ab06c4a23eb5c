// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use strongbox_audit::SqliteAuditLog;
use strongbox_auth::{
	ActorContext, ActorId, AuthError, AuthResult, DirectoryUser, IdentityProvider, LocalDirectory,
	SessionId, StepUpRegistry,
};
use strongbox_common_secret::SecretString;
use strongbox_config::{Settings, SettingsProvider, StaticSettings};
use strongbox_crypto::{EncryptionKey, EncryptionService};
use strongbox_db::testing::create_test_pool;
use strongbox_db::CredentialRepository;

use crate::gate::AccessGate;
use crate::service::CredentialService;

pub const ADMIN_PASSWORD: &str = "admin-password";
pub const ALICE_PASSWORD: &str = "alice-password";

/// Plain-text password check, standing in for the platform's identity system.
struct FixedPasswords(HashMap<ActorId, &'static str>);

#[async_trait]
impl IdentityProvider for FixedPasswords {
	async fn current_actor(&self, _token: &SecretString) -> AuthResult<Option<ActorContext>> {
		Ok(None)
	}

	async fn verify_actor_password(
		&self,
		actor: &strongbox_auth::Identity,
		secret: &SecretString,
	) -> AuthResult<bool> {
		match self.0.get(&actor.id) {
			Some(password) => Ok(secret.expose().as_str() == *password),
			None => Err(AuthError::UnknownUser(actor.id.to_string())),
		}
	}
}

pub struct Fixture {
	pub pool: SqlitePool,
	pub settings: Arc<StaticSettings>,
	pub directory: Arc<LocalDirectory>,
	pub gate: Arc<AccessGate>,
	pub service: CredentialService,
	pub admin: ActorContext,
	pub alice: ActorContext,
	/// Known to the directory but never granted access.
	pub mallory: ActorContext,
}

impl Fixture {
	pub async fn enable_password_verification(&self) {
		self
			.settings
			.update_settings(Settings {
				require_password_verification: true,
				..Settings::default()
			})
			.await
			.unwrap();
	}

	/// Same database, gate and directory behind a different encryption service.
	pub async fn with_crypto(self, crypto: EncryptionService) -> Fixture {
		let service = CredentialService::new(
			CredentialRepository::new(self.pool.clone()),
			Arc::new(crypto),
			self.gate.clone(),
			self.directory.clone(),
		);
		Fixture { service, ..self }
	}
}

fn user(username: &str, is_admin: bool, credentials_access: bool) -> DirectoryUser {
	DirectoryUser {
		username: username.to_string(),
		display_name: username.to_string(),
		password_hash: "unused".to_string(),
		is_admin,
		credentials_access,
	}
}

fn context(username: &str, is_admin: bool) -> ActorContext {
	ActorContext {
		identity: strongbox_auth::Identity {
			id: ActorId::new(username),
			display_name: username.to_string(),
			is_admin,
		},
		session_id: SessionId::generate(),
		session_expires_at: Utc::now() + Duration::hours(8),
	}
}

pub async fn fixture() -> Fixture {
	fixture_with_crypto(EncryptionService::new(EncryptionKey::generate(1))).await
}

pub async fn fixture_with_crypto(crypto: EncryptionService) -> Fixture {
	let pool = create_test_pool().await.unwrap();
	let settings = Arc::new(StaticSettings::default());
	let directory = Arc::new(LocalDirectory::new(
		[
			user("admin", true, false),
			user("alice", false, true),
			user("mallory", false, false),
		],
		Duration::hours(8),
	));
	let passwords = FixedPasswords(HashMap::from([
		(ActorId::new("admin"), ADMIN_PASSWORD),
		(ActorId::new("alice"), ALICE_PASSWORD),
		(ActorId::new("mallory"), "mallory-password"),
	]));

	let gate = Arc::new(AccessGate::new(
		directory.clone(),
		Arc::new(passwords),
		settings.clone(),
		StepUpRegistry::new(),
		SqliteAuditLog::new(pool.clone()),
	));
	let service = CredentialService::new(
		CredentialRepository::new(pool.clone()),
		Arc::new(crypto),
		gate.clone(),
		directory.clone(),
	);

	Fixture {
		pool,
		settings,
		directory,
		gate,
		service,
		admin: context("admin", true),
		alice: context("alice", false),
		mallory: context("mallory", false),
	}
}
