// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router.

use std::sync::Arc;

use axum::{
	routing::{get, post, put},
	Router,
};
use sqlx::SqlitePool;
use strongbox_audit::SqliteAuditLog;
use strongbox_auth::{DirectoryUser, IdentityProvider, LocalDirectory, StepUpRegistry};
use strongbox_config::{ServerConfig, SettingsProvider};
use strongbox_credentials::{AccessGate, CredentialService};
use strongbox_crypto::EncryptionService;
use strongbox_db::{CredentialRepository, DbError, SqliteGrantStore, SqliteSettingsStore};
use strongbox_jobs::JobScheduler;
use tracing::info;

use crate::routes;

#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub credentials: Arc<CredentialService>,
	pub directory: Arc<LocalDirectory>,
	pub identity: Arc<dyn IdentityProvider>,
	pub settings: Arc<dyn SettingsProvider>,
	pub audit: SqliteAuditLog,
	/// Set once the scheduler has been started; `/health` reports on it.
	pub scheduler: Option<Arc<JobScheduler>>,
}

/// Wire the services together over a migrated pool. The settings store is
/// seeded from `config.settings` if it is empty, and stored capability
/// grants are applied over the configured users.
pub async fn create_app_state(
	pool: SqlitePool,
	config: &ServerConfig,
	crypto: EncryptionService,
) -> strongbox_db::Result<AppState> {
	let settings_store = SqliteSettingsStore::new(pool.clone(), config.settings);
	settings_store.seed().await?;
	let settings: Arc<dyn SettingsProvider> = Arc::new(settings_store);

	let users = config.directory.users.iter().map(|user| DirectoryUser {
		username: user.username.clone(),
		display_name: user
			.display_name
			.clone()
			.unwrap_or_else(|| user.username.clone()),
		password_hash: user.password_hash.clone(),
		is_admin: user.admin,
		credentials_access: user.credentials_access,
	});
	let directory = LocalDirectory::new(
		users,
		chrono::Duration::seconds(config.session.lifetime_secs as i64),
	)
	.with_grant_store(Arc::new(SqliteGrantStore::new(pool.clone())));
	directory
		.load_grants()
		.await
		.map_err(|e| DbError::Internal(format!("failed to load capability grants: {e}")))?;
	let directory = Arc::new(directory);

	let step_up = match config.step_up.max_lifetime_secs {
		Some(secs) => StepUpRegistry::with_max_lifetime(chrono::Duration::seconds(secs as i64)),
		None => StepUpRegistry::new(),
	};

	let audit = SqliteAuditLog::new(pool.clone());
	let gate = Arc::new(AccessGate::new(
		directory.clone(),
		directory.clone(),
		settings.clone(),
		step_up,
		audit.clone(),
	));
	let credentials = Arc::new(CredentialService::new(
		CredentialRepository::new(pool.clone()),
		Arc::new(crypto),
		gate,
		directory.clone(),
	));

	info!(
		users = config.directory.users.len(),
		encryption_available = credentials.encryption_available(),
		"application state ready"
	);

	Ok(AppState {
		pool,
		credentials,
		identity: directory.clone(),
		directory,
		settings,
		audit,
		scheduler: None,
	})
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health_check))
		.route(
			"/api/session",
			get(routes::session::current_session)
				.post(routes::session::login)
				.delete(routes::session::logout),
		)
		.route(
			"/api/credentials",
			get(routes::credentials::list_credentials).post(routes::credentials::create_credential),
		)
		.route(
			"/api/credentials/types",
			get(routes::credentials::list_credential_types),
		)
		.route(
			"/api/credentials/export",
			post(routes::credentials::export_credentials),
		)
		.route(
			"/api/credentials/{id}",
			get(routes::credentials::get_credential)
				.patch(routes::credentials::update_credential)
				.delete(routes::credentials::delete_credential),
		)
		.route(
			"/api/credentials/{id}/reveal",
			post(routes::credentials::reveal_credential),
		)
		.route("/api/verify-password", post(routes::session::verify_password))
		.route("/api/audit", get(routes::audit::query_audit_log))
		.route("/api/audit/actions", get(routes::audit::list_audit_actions))
		.route(
			"/api/settings",
			get(routes::settings::get_settings).put(routes::settings::update_settings),
		)
		.route("/api/jobs/{id}/run", post(routes::jobs::run_job))
		.route("/api/access", get(routes::access::list_access))
		.route(
			"/api/access/{user}",
			put(routes::access::grant_access).delete(routes::access::revoke_access),
		)
		.with_state(state)
}
