// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access control gate.
//!
//! Every credential entry point passes through here before touching the
//! store: the capability check, the step-up requirement for reveals, and
//! step-up verification itself.

use std::sync::Arc;

use strongbox_audit::{AuditAction, NewAuditEntry, SqliteAuditLog};
use strongbox_auth::{
	ActorContext, AuthError, AuthorizationPolicy, Capability, Identity, IdentityProvider,
	StepUpRegistry, StepUpSession, StepUpState,
};
use strongbox_common_secret::SecretString;
use strongbox_config::{Settings, SettingsProvider};
use tracing::{error, info, instrument, warn};

use crate::error::{CredentialError, CredentialResult};

pub struct AccessGate {
	policy: Arc<dyn AuthorizationPolicy>,
	identity: Arc<dyn IdentityProvider>,
	settings: Arc<dyn SettingsProvider>,
	step_up: StepUpRegistry,
	audit: SqliteAuditLog,
}

impl AccessGate {
	pub fn new(
		policy: Arc<dyn AuthorizationPolicy>,
		identity: Arc<dyn IdentityProvider>,
		settings: Arc<dyn SettingsProvider>,
		step_up: StepUpRegistry,
		audit: SqliteAuditLog,
	) -> Self {
		Self {
			policy,
			identity,
			settings,
			step_up,
			audit,
		}
	}

	pub fn audit(&self) -> &SqliteAuditLog {
		&self.audit
	}

	pub fn settings(&self) -> &Arc<dyn SettingsProvider> {
		&self.settings
	}

	pub fn step_up(&self) -> &StepUpRegistry {
		&self.step_up
	}

	pub(crate) async fn current_settings(&self) -> CredentialResult<Settings> {
		Ok(self.settings.get_settings().await?)
	}

	/// Administrators always qualify. Provider errors are returned, not
	/// treated as a grant.
	pub async fn has_credentials_capability(&self, actor: &Identity) -> CredentialResult<bool> {
		if actor.is_admin {
			return Ok(true);
		}
		self
			.policy
			.actor_has_capability(actor, Capability::ViewCredentials)
			.await
			.map_err(|e| CredentialError::Internal(format!("authorization provider failed: {e}")))
	}

	#[instrument(skip(self, ctx), fields(actor = %ctx.actor_id()))]
	pub async fn require_authorized(&self, ctx: &ActorContext) -> CredentialResult<()> {
		if self.has_credentials_capability(&ctx.identity).await? {
			return Ok(());
		}
		warn!("credentials capability missing");
		Err(CredentialError::Forbidden(
			"the credentials capability is required".to_string(),
		))
	}

	/// Capability plus platform administrator status.
	pub async fn require_admin(&self, ctx: &ActorContext) -> CredentialResult<()> {
		self.require_authorized(ctx).await?;
		if !ctx.identity.is_admin {
			warn!(actor = %ctx.actor_id(), "administrator required");
			return Err(CredentialError::Forbidden(
				"administrator privileges are required".to_string(),
			));
		}
		Ok(())
	}

	/// Fails with `Forbidden` when reveals require password verification and
	/// the caller's session has none, or it has expired.
	pub(crate) async fn require_step_up(&self, ctx: &ActorContext) -> CredentialResult<()> {
		let settings = self.current_settings().await?;
		if settings.require_password_verification && !self.step_up.is_verified(ctx) {
			return Err(CredentialError::Forbidden(
				"password verification required".to_string(),
			));
		}
		Ok(())
	}

	pub fn step_up_state(&self, ctx: &ActorContext) -> StepUpState {
		self.step_up.state(ctx)
	}

	/// Check `secret` against the caller's own password and mark the session
	/// verified. Exactly one `verify_success` or `verify_failure` entry is
	/// written per call. Unknown accounts fail like wrong passwords.
	#[instrument(skip(self, ctx, secret), fields(actor = %ctx.actor_id()))]
	pub async fn verify_step_up(
		&self,
		ctx: &ActorContext,
		secret: &SecretString,
	) -> CredentialResult<StepUpSession> {
		let actor = ctx.actor_id().clone();
		match self.check_secret(ctx, secret).await {
			Ok(()) => {
				let session = self.step_up.record_verified(ctx);
				let entry = NewAuditEntry::new(AuditAction::VerifySuccess, actor)
					.success()
					.detail("expires_at", session.expires_at.to_rfc3339());
				if let Err(e) = self.audit.append(entry).await {
					self.step_up.invalidate(ctx.actor_id(), ctx.session_id);
					error!(error = %e, "verification not recorded, discarding it");
					return Err(e.into());
				}
				info!(expires_at = %session.expires_at, "step-up verified");
				Ok(session)
			}
			Err(e) => {
				let entry = NewAuditEntry::new(AuditAction::VerifyFailure, actor);
				record_failure(&self.audit, entry, &e).await;
				Err(e)
			}
		}
	}

	async fn check_secret(&self, ctx: &ActorContext, secret: &SecretString) -> CredentialResult<()> {
		self.require_authorized(ctx).await?;
		if secret.is_empty() {
			return Err(CredentialError::AuthFailed);
		}
		match self.identity.verify_actor_password(&ctx.identity, secret).await {
			Ok(true) => Ok(()),
			Ok(false) | Err(AuthError::UnknownUser(_)) | Err(AuthError::InvalidCredentials) => {
				warn!("step-up password rejected");
				Err(CredentialError::AuthFailed)
			}
			Err(e) => Err(CredentialError::Internal(format!(
				"identity provider failed: {e}"
			))),
		}
	}

	/// Drop the step-up state for the caller's session.
	#[instrument(skip(self, ctx), fields(actor = %ctx.actor_id()))]
	pub async fn logout(&self, ctx: &ActorContext) -> CredentialResult<()> {
		self.step_up.invalidate(ctx.actor_id(), ctx.session_id);
		self
			.audit
			.append(
				NewAuditEntry::new(AuditAction::Logout, ctx.actor_id().clone())
					.detail("session_id", ctx.session_id.to_string())
					.success(),
			)
			.await?;
		Ok(())
	}
}

/// Record a failed action. The caller's error is what gets returned, so a
/// ledger failure here is only logged.
pub(crate) async fn record_failure(
	audit: &SqliteAuditLog,
	entry: NewAuditEntry,
	err: &CredentialError,
) {
	let action = entry.action;
	if let Err(audit_err) = audit.append(entry.failure(err.kind())).await {
		error!(
			%action,
			error_kind = err.kind(),
			audit_error = %audit_err,
			"failed to record failed action in audit log"
		);
	}
}
