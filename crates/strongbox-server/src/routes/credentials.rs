// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential HTTP handlers.
//!
//! Everything here returns summaries only, except `reveal`, whose response
//! is the single place decrypted payloads leave the server.

use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::IntoResponse,
	Json,
};
use serde::Serialize;
use strongbox_audit::AuditAction;
use strongbox_auth::ActorContext;
use strongbox_credentials::{
	CreateCredentialInput, CredentialError, CredentialSummary, CredentialTypeInfo, ExposedPayload,
	UpdateCredentialInput,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::auth::RequireActor;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct ListCredentialsResponse {
	pub credentials: Vec<CredentialSummary>,
}

#[derive(Debug, Serialize)]
pub struct RevealCredentialResponse<'a> {
	pub credential: &'a CredentialSummary,
	pub payload: ExposedPayload<'a>,
}

fn parse_credential_id(raw: &str) -> ApiResult<Uuid> {
	Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("invalid credential id: {raw}")))
}

/// For audited actions a malformed id is itself recorded as a failed attempt.
async fn parse_audited_id(
	state: &AppState,
	ctx: &ActorContext,
	action: AuditAction,
	raw: &str,
) -> ApiResult<Uuid> {
	match Uuid::parse_str(raw) {
		Ok(id) => Ok(id),
		Err(_) => Err(state.credentials.reject_malformed_id(ctx, action, raw).await.into()),
	}
}

pub async fn list_credentials(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
) -> ApiResult<Json<ListCredentialsResponse>> {
	let credentials = state.credentials.list_credentials(&ctx).await?;
	Ok(Json(ListCredentialsResponse { credentials }))
}

/// Static catalogue; any signed-in caller may read it.
pub async fn list_credential_types(
	State(state): State<AppState>,
	RequireActor(_ctx): RequireActor,
) -> Json<Vec<CredentialTypeInfo>> {
	Json(state.credentials.list_credential_types())
}

pub async fn create_credential(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
	Json(input): Json<CreateCredentialInput>,
) -> ApiResult<(StatusCode, Json<CredentialSummary>)> {
	let summary = state.credentials.create_credential(&ctx, input).await?;
	Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn get_credential(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
	Path(id): Path<String>,
) -> ApiResult<Json<CredentialSummary>> {
	let id = parse_credential_id(&id)?;
	Ok(Json(state.credentials.get_credential_summary(&ctx, id).await?))
}

pub async fn update_credential(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
	Path(id): Path<String>,
	Json(input): Json<UpdateCredentialInput>,
) -> ApiResult<Json<CredentialSummary>> {
	let id = parse_audited_id(&state, &ctx, AuditAction::Update, &id).await?;
	Ok(Json(state.credentials.update_credential(&ctx, id, input).await?))
}

pub async fn delete_credential(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
	Path(id): Path<String>,
) -> ApiResult<StatusCode> {
	let id = parse_audited_id(&state, &ctx, AuditAction::Delete, &id).await?;
	state.credentials.delete_credential(&ctx, id).await?;
	Ok(StatusCode::NO_CONTENT)
}

pub async fn reveal_credential(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
	Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
	let id = parse_audited_id(&state, &ctx, AuditAction::View, &id).await?;
	let revealed = state.credentials.reveal_credential(&ctx, id).await?;
	let body = serde_json::to_value(RevealCredentialResponse {
		credential: &revealed.summary,
		payload: revealed.payload.exposed(),
	})
	.map_err(|e| CredentialError::Internal(format!("failed to encode revealed credential: {e}")))?;
	Ok(([(axum::http::header::CACHE_CONTROL, "no-store")], Json(body)))
}

pub async fn export_credentials(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
) -> ApiResult<StatusCode> {
	state.credentials.export_credentials(&ctx).await?;
	Ok(StatusCode::NO_CONTENT)
}
