// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential store service.
//!
//! The only path from a stored ciphertext to plaintext is
//! [`CredentialService::reveal_credential`], which runs the gate first.
//! Mutations and their audit entries commit in one transaction; if the
//! ledger write fails the mutation is rolled back.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use strongbox_audit::{AuditAction, AuditFilter, AuditPage, NewAuditEntry, PageRequest};
use strongbox_auth::{
	AccessDirectory, AccessEntry, ActorContext, ActorId, Capability, StepUpSession, StepUpState,
};
use strongbox_common_secret::SecretString;
use strongbox_config::Settings;
use strongbox_crypto::{Ciphertext, CryptoError, EncryptionService, KeyId};
use strongbox_db::{CredentialRecord, CredentialRepository};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{CredentialError, CredentialResult};
use crate::gate::{record_failure, AccessGate};
use crate::types::{
	CreateCredentialInput, CredentialKind, CredentialPayload, CredentialSummary, CredentialTypeInfo,
	RevealedCredential, UpdateCredentialInput,
};
use crate::validation::{validate_label, validate_notes, validate_payload, validate_url};

const MAX_LOGGED_ID_CHARS: usize = 64;

/// Settings as seen by the UI, including the degraded-mode flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveSettings {
	#[serde(flatten)]
	pub settings: Settings,
	pub encryption_available: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub encryption_unavailable_reason: Option<String>,
	/// Step-up state of the calling session.
	pub step_up: StepUpState,
}

pub struct CredentialService {
	repo: CredentialRepository,
	crypto: Arc<EncryptionService>,
	gate: Arc<AccessGate>,
	access: Arc<dyn AccessDirectory>,
}

impl CredentialService {
	pub fn new(
		repo: CredentialRepository,
		crypto: Arc<EncryptionService>,
		gate: Arc<AccessGate>,
		access: Arc<dyn AccessDirectory>,
	) -> Self {
		Self {
			repo,
			crypto,
			gate,
			access,
		}
	}

	pub fn gate(&self) -> &Arc<AccessGate> {
		&self.gate
	}

	pub fn encryption_available(&self) -> bool {
		self.crypto.is_available()
	}

	/// Summaries of every credential. No secret material, no step-up.
	#[instrument(skip(self, ctx), fields(actor = %ctx.actor_id()))]
	pub async fn list_credentials(&self, ctx: &ActorContext) -> CredentialResult<Vec<CredentialSummary>> {
		let entry = NewAuditEntry::new(AuditAction::List, ctx.actor_id().clone());
		let summaries = self.audit_failure(entry.clone(), self.list_inner(ctx).await).await?;
		self
			.gate
			.audit()
			.append(entry.success().detail("count", summaries.len()))
			.await?;
		Ok(summaries)
	}

	async fn list_inner(&self, ctx: &ActorContext) -> CredentialResult<Vec<CredentialSummary>> {
		self.gate.require_authorized(ctx).await?;
		let records = self.repo.list().await?;
		Ok(records
			.iter()
			.filter_map(|record| match summarize(record) {
				Ok(summary) => Some(summary),
				Err(e) => {
					error!(credential_id = %record.id, error = %e, "skipping unreadable credential");
					None
				}
			})
			.collect())
	}

	#[instrument(skip(self, ctx), fields(actor = %ctx.actor_id()))]
	pub async fn get_credential_summary(
		&self,
		ctx: &ActorContext,
		id: Uuid,
	) -> CredentialResult<CredentialSummary> {
		self.gate.require_authorized(ctx).await?;
		let record = self.load(id).await?;
		summarize(&record)
	}

	/// Decrypt and return a credential's payload. Every call, successful or
	/// not, writes one `view` entry; the payload is only returned once the
	/// success entry is stored.
	#[instrument(skip(self, ctx), fields(actor = %ctx.actor_id()))]
	pub async fn reveal_credential(
		&self,
		ctx: &ActorContext,
		id: Uuid,
	) -> CredentialResult<RevealedCredential> {
		let entry = NewAuditEntry::new(AuditAction::View, ctx.actor_id().clone()).target(id.to_string());
		let revealed = self.audit_failure(entry.clone(), self.reveal_inner(ctx, id).await).await?;
		self
			.gate
			.audit()
			.append(entry.success().detail("type", revealed.summary.kind.as_str()))
			.await?;
		info!(credential_id = %id, "credential revealed");
		Ok(revealed)
	}

	async fn reveal_inner(&self, ctx: &ActorContext, id: Uuid) -> CredentialResult<RevealedCredential> {
		self.gate.require_authorized(ctx).await?;
		self.ensure_crypto()?;
		self.gate.require_step_up(ctx).await?;

		let record = self.load(id).await?;
		let summary = summarize(&record)?;
		let payload = self.decrypt_record(&record, summary.kind)?;
		Ok(RevealedCredential { summary, payload })
	}

	fn decrypt_record(
		&self,
		record: &CredentialRecord,
		kind: CredentialKind,
	) -> CredentialResult<CredentialPayload> {
		let id = record.id;
		let ciphertext = Ciphertext::from_blob(record.key_id, &record.encrypted_payload)?;
		let plaintext = self
			.crypto
			.decrypt(&ciphertext, Some(id.as_bytes()))
			.map_err(|e| {
				if matches!(e, CryptoError::TamperDetected) {
					error!(credential_id = %id, "stored credential failed integrity check");
				}
				CredentialError::from(e)
			})?;

		let payload = CredentialPayload::from_plaintext(&plaintext)?;
		if payload.kind() != kind {
			return Err(CredentialError::Corrupt(format!(
				"credential {id} is typed '{kind}' but holds a '{}' payload",
				payload.kind()
			)));
		}
		Ok(payload)
	}

	#[instrument(skip(self, ctx, input), fields(actor = %ctx.actor_id(), kind = %input.kind))]
	pub async fn create_credential(
		&self,
		ctx: &ActorContext,
		input: CreateCredentialInput,
	) -> CredentialResult<CredentialSummary> {
		let entry = NewAuditEntry::new(AuditAction::Create, ctx.actor_id().clone())
			.detail("type", input.kind.as_str());
		let result = self.create_inner(ctx, input, entry.clone()).await;
		self.audit_failure(entry, result).await
	}

	async fn create_inner(
		&self,
		ctx: &ActorContext,
		input: CreateCredentialInput,
		entry: NewAuditEntry,
	) -> CredentialResult<CredentialSummary> {
		self.gate.require_authorized(ctx).await?;

		let label = validate_label(&input.label)?;
		let url = validate_url(input.url.as_deref())?;
		let notes = validate_notes(input.notes.as_deref())?;
		let payload = CredentialPayload::from_fields(input.kind, input.payload)?;
		validate_payload(&payload)?;

		self.ensure_crypto()?;
		let id = Uuid::new_v4();
		let (encrypted_payload, key_id) = self.encrypt_payload(id, &payload)?;
		drop(payload);

		let now = Utc::now();
		let record = CredentialRecord {
			id,
			label,
			kind: input.kind.as_str().to_string(),
			encrypted_payload,
			key_id,
			url,
			notes,
			created_by: ctx.actor_id().to_string(),
			created_at: now,
			updated_at: now,
			version: 1,
		};

		let mut tx = self.repo.pool().begin().await?;
		self.repo.insert_in(&mut *tx, &record).await?;
		self
			.gate
			.audit()
			.append_in(&mut *tx, entry.target(id.to_string()).success())
			.await?;
		tx.commit().await?;

		info!(credential_id = %id, "credential created");
		summarize(&record)
	}

	/// Partial update. Payload fields that are left out keep their stored
	/// value; changing the type requires a complete replacement payload. The
	/// audit entry names the changed fields, never their values.
	#[instrument(skip(self, ctx, input), fields(actor = %ctx.actor_id()))]
	pub async fn update_credential(
		&self,
		ctx: &ActorContext,
		id: Uuid,
		input: UpdateCredentialInput,
	) -> CredentialResult<CredentialSummary> {
		let entry = NewAuditEntry::new(AuditAction::Update, ctx.actor_id().clone()).target(id.to_string());
		let result = self.update_inner(ctx, id, input, entry.clone()).await;
		self.audit_failure(entry, result).await
	}

	async fn update_inner(
		&self,
		ctx: &ActorContext,
		id: Uuid,
		input: UpdateCredentialInput,
		entry: NewAuditEntry,
	) -> CredentialResult<CredentialSummary> {
		self.gate.require_authorized(ctx).await?;
		self.ensure_crypto()?;

		if input.is_empty() {
			return Err(CredentialError::Validation("no fields to update".to_string()));
		}
		if input.kind.is_some() && input.payload.is_none() {
			return Err(CredentialError::Validation(
				"changing the type requires a new payload".to_string(),
			));
		}
		let label = input.label.as_deref().map(validate_label).transpose()?;
		let url = input
			.url
			.as_deref()
			.map(|url| validate_url(Some(url)))
			.transpose()?;
		let notes = input
			.notes
			.as_deref()
			.map(|notes| validate_notes(Some(notes)))
			.transpose()?;

		let current = self.load(id).await?;
		if let Some(expected) = input.expected_version {
			if expected != current.version {
				return Err(CredentialError::Conflict(format!(
					"credential {id} is at version {}, not {expected}",
					current.version
				)));
			}
		}

		let stored_kind = stored_kind(&current)?;
		let kind = input.kind.unwrap_or(stored_kind);
		let payload = match input.payload {
			None => None,
			Some(fields) if kind == stored_kind => {
				let stored = self.decrypt_record(&current, stored_kind)?;
				Some(stored.merge_fields(fields)?)
			}
			Some(fields) => Some(CredentialPayload::from_fields(kind, fields)?),
		};
		if let Some(payload) = &payload {
			validate_payload(payload)?;
		}

		let mut next = current.clone();
		let mut changed: Vec<&str> = Vec::new();
		if let Some(label) = label {
			if label != current.label {
				changed.push("label");
			}
			next.label = label;
		}
		if let Some(url) = url {
			if url != current.url {
				changed.push("url");
			}
			next.url = url;
		}
		if let Some(notes) = notes {
			if notes != current.notes {
				changed.push("notes");
			}
			next.notes = notes;
		}
		if let Some(payload) = payload {
			if kind != stored_kind {
				changed.push("type");
				next.kind = kind.as_str().to_string();
			}
			let (encrypted_payload, key_id) = self.encrypt_payload(id, &payload)?;
			next.encrypted_payload = encrypted_payload;
			next.key_id = key_id;
			changed.push("payload");
		}
		next.version = current.version + 1;
		next.updated_at = Utc::now();

		let mut tx = self.repo.pool().begin().await?;
		self.repo.update_in(&mut *tx, &next, current.version).await?;
		self
			.gate
			.audit()
			.append_in(
				&mut *tx,
				entry
					.success()
					.detail("fields_changed", changed.clone())
					.detail("version", next.version),
			)
			.await?;
		tx.commit().await?;

		info!(credential_id = %id, ?changed, version = next.version, "credential updated");
		summarize(&next)
	}

	/// Hard delete. Allowed while encryption is unavailable.
	#[instrument(skip(self, ctx), fields(actor = %ctx.actor_id()))]
	pub async fn delete_credential(&self, ctx: &ActorContext, id: Uuid) -> CredentialResult<()> {
		let entry = NewAuditEntry::new(AuditAction::Delete, ctx.actor_id().clone()).target(id.to_string());
		let result = self.delete_inner(ctx, id, entry.clone()).await;
		self.audit_failure(entry, result).await
	}

	async fn delete_inner(
		&self,
		ctx: &ActorContext,
		id: Uuid,
		entry: NewAuditEntry,
	) -> CredentialResult<()> {
		self.gate.require_authorized(ctx).await?;

		let mut tx = self.repo.pool().begin().await?;
		self.repo.delete_in(&mut *tx, id).await?;
		self.gate.audit().append_in(&mut *tx, entry.success()).await?;
		tx.commit().await?;

		info!(credential_id = %id, "credential deleted");
		Ok(())
	}

	pub fn list_credential_types(&self) -> Vec<CredentialTypeInfo> {
		CredentialKind::ALL
			.into_iter()
			.map(|kind| CredentialTypeInfo {
				kind,
				label: kind.label(),
				fields: kind.fields(),
			})
			.collect()
	}

	/// Step-up verification for the caller's session.
	pub async fn verify_password(
		&self,
		ctx: &ActorContext,
		secret: &SecretString,
	) -> CredentialResult<StepUpSession> {
		self.gate.verify_step_up(ctx, secret).await
	}

	pub fn step_up_state(&self, ctx: &ActorContext) -> StepUpState {
		self.gate.step_up_state(ctx)
	}

	pub async fn logout(&self, ctx: &ActorContext) -> CredentialResult<()> {
		self.gate.logout(ctx).await
	}

	#[instrument(skip(self, ctx), fields(actor = %ctx.actor_id()))]
	pub async fn query_audit_log(
		&self,
		ctx: &ActorContext,
		filter: &AuditFilter,
		page: PageRequest,
	) -> CredentialResult<AuditPage> {
		self.gate.require_authorized(ctx).await?;
		Ok(self.gate.audit().query(filter, page).await?)
	}

	/// Readable by any signed-in actor so the degraded-mode warning can be
	/// shown to everyone.
	pub async fn get_effective_settings(&self, ctx: &ActorContext) -> CredentialResult<EffectiveSettings> {
		let settings = self.gate.current_settings().await?;
		Ok(EffectiveSettings {
			settings,
			encryption_available: self.crypto.is_available(),
			encryption_unavailable_reason: self.crypto.unavailable_reason().map(str::to_string),
			step_up: self.gate.step_up_state(ctx),
		})
	}

	/// Administrators only. Reverted if the audit entry cannot be written.
	#[instrument(skip(self, ctx), fields(actor = %ctx.actor_id()))]
	pub async fn update_settings(
		&self,
		ctx: &ActorContext,
		settings: Settings,
	) -> CredentialResult<EffectiveSettings> {
		let entry = NewAuditEntry::new(AuditAction::SettingsUpdate, ctx.actor_id().clone());
		let previous = self
			.audit_failure(entry.clone(), self.apply_settings(ctx, settings).await)
			.await?;

		let entry = entry
			.success()
			.detail("previous", settings_json(&previous))
			.detail("current", settings_json(&settings));
		if let Err(e) = self.gate.audit().append(entry).await {
			error!(error = %e, "settings change not recorded, reverting");
			if let Err(revert) = self.gate.settings().update_settings(previous).await {
				error!(error = %revert, "failed to revert settings");
			}
			return Err(e.into());
		}

		info!(?previous, current = ?settings, "settings updated");
		self.get_effective_settings(ctx).await
	}

	async fn apply_settings(&self, ctx: &ActorContext, settings: Settings) -> CredentialResult<Settings> {
		self.gate.require_admin(ctx).await?;
		settings.validate()?;
		let previous = self.gate.current_settings().await?;
		self.gate.settings().update_settings(settings).await?;
		Ok(previous)
	}

	#[instrument(skip(self, ctx), fields(actor = %ctx.actor_id()))]
	pub async fn list_access(&self, ctx: &ActorContext) -> CredentialResult<Vec<AccessEntry>> {
		self.gate.require_admin(ctx).await?;
		Ok(self.access.list_access(Capability::ViewCredentials).await?)
	}

	pub async fn grant_access(&self, ctx: &ActorContext, user: &ActorId) -> CredentialResult<AccessEntry> {
		self.change_access(ctx, user, true).await
	}

	pub async fn revoke_access(&self, ctx: &ActorContext, user: &ActorId) -> CredentialResult<AccessEntry> {
		self.change_access(ctx, user, false).await
	}

	#[instrument(skip(self, ctx), fields(actor = %ctx.actor_id()))]
	async fn change_access(
		&self,
		ctx: &ActorContext,
		user: &ActorId,
		grant: bool,
	) -> CredentialResult<AccessEntry> {
		let action = if grant {
			AuditAction::AccessGranted
		} else {
			AuditAction::AccessRevoked
		};
		let entry = NewAuditEntry::new(action, ctx.actor_id().clone()).target(user.as_str());
		let (previous, current) = self
			.audit_failure(entry.clone(), self.apply_access(ctx, user, grant).await)
			.await?;

		let entry = entry
			.success()
			.detail("had_access", previous.has_access)
			.detail("has_access", current.has_access);
		if let Err(e) = self.gate.audit().append(entry).await {
			error!(error = %e, %user, "access change not recorded, reverting");
			if previous.has_access != grant {
				if let Err(revert) = self.set_access(user, previous.has_access).await {
					error!(error = %revert, %user, "failed to revert access change");
				}
			}
			return Err(e.into());
		}

		info!(%user, has_access = current.has_access, "credentials access changed");
		Ok(current)
	}

	async fn apply_access(
		&self,
		ctx: &ActorContext,
		user: &ActorId,
		grant: bool,
	) -> CredentialResult<(AccessEntry, AccessEntry)> {
		self.gate.require_admin(ctx).await?;
		let previous = self.access_entry(user).await?;
		self.set_access(user, grant).await?;
		let current = self.access_entry(user).await?;
		Ok((previous, current))
	}

	async fn set_access(&self, user: &ActorId, grant: bool) -> CredentialResult<()> {
		if grant {
			self.access.grant(user, Capability::ViewCredentials).await?;
		} else {
			self.access.revoke(user, Capability::ViewCredentials).await?;
		}
		Ok(())
	}

	async fn access_entry(&self, user: &ActorId) -> CredentialResult<AccessEntry> {
		self
			.access
			.list_access(Capability::ViewCredentials)
			.await?
			.into_iter()
			.find(|entry| entry.actor_id == *user)
			.ok_or_else(|| CredentialError::NotFound(format!("user {user}")))
	}

	/// Bulk export is not offered. Attempts are refused and recorded.
	#[instrument(skip(self, ctx), fields(actor = %ctx.actor_id()))]
	pub async fn export_credentials(&self, ctx: &ActorContext) -> CredentialResult<()> {
		warn!("credential export attempted");
		let err = CredentialError::Forbidden("bulk export of credentials is disabled".to_string());
		record_failure(
			self.gate.audit(),
			NewAuditEntry::new(AuditAction::ExportAttempt, ctx.actor_id().clone()),
			&err,
		)
		.await;
		Err(err)
	}

	/// Record a reveal, update or delete that named an id which is not a
	/// credential id, and return the validation error for it.
	pub async fn reject_malformed_id(
		&self,
		ctx: &ActorContext,
		action: AuditAction,
		raw_id: &str,
	) -> CredentialError {
		let target: String = raw_id.chars().take(MAX_LOGGED_ID_CHARS).collect();
		let err = CredentialError::Validation(format!("invalid credential id: {target}"));
		warn!(%action, target = %target, "malformed credential id");
		record_failure(
			self.gate.audit(),
			NewAuditEntry::new(action, ctx.actor_id().clone()).target(target),
			&err,
		)
		.await;
		err
	}

	async fn audit_failure<T>(
		&self,
		entry: NewAuditEntry,
		result: CredentialResult<T>,
	) -> CredentialResult<T> {
		if let Err(e) = &result {
			record_failure(self.gate.audit(), entry, e).await;
		}
		result
	}

	fn ensure_crypto(&self) -> CredentialResult<()> {
		if self.crypto.is_available() {
			return Ok(());
		}
		let reason = self
			.crypto
			.unavailable_reason()
			.unwrap_or("encryption unavailable")
			.to_string();
		warn!(%reason, "refusing secret operation in degraded mode");
		Err(CredentialError::CryptoUnavailable(reason))
	}

	fn encrypt_payload(
		&self,
		id: Uuid,
		payload: &CredentialPayload,
	) -> CredentialResult<(Vec<u8>, KeyId)> {
		let plaintext = payload.to_plaintext()?;
		let ciphertext = self.crypto.encrypt(&plaintext, Some(id.as_bytes()))?;
		Ok((ciphertext.to_blob(), ciphertext.key_id))
	}

	async fn load(&self, id: Uuid) -> CredentialResult<CredentialRecord> {
		self
			.repo
			.get(id)
			.await?
			.ok_or_else(|| CredentialError::NotFound(format!("credential {id}")))
	}
}

fn stored_kind(record: &CredentialRecord) -> CredentialResult<CredentialKind> {
	record.kind.parse().map_err(|_| {
		CredentialError::Corrupt(format!(
			"credential {} has unknown type '{}'",
			record.id, record.kind
		))
	})
}

fn summarize(record: &CredentialRecord) -> CredentialResult<CredentialSummary> {
	let kind = stored_kind(record)?;
	Ok(CredentialSummary {
		id: record.id,
		label: record.label.clone(),
		kind,
		type_label: kind.label(),
		url: record.url.clone(),
		notes: record.notes.clone(),
		created_by: record.created_by.clone(),
		created_at: record.created_at,
		updated_at: record.updated_at,
		version: record.version,
	})
}

fn settings_json(settings: &Settings) -> Value {
	json!({
		"require_password_verification": settings.require_password_verification,
		"audit_log_retention_days": settings.audit_log_retention_days,
	})
}
