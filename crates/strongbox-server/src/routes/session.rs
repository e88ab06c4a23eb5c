// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Interactive sessions and step-up verification.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strongbox_auth::{AuthError, Identity, StepUpState};
use strongbox_common_secret::SecretString;
use strongbox_credentials::CredentialError;

use crate::api::AppState;
use crate::auth::{BearerToken, RequireActor};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
	pub username: String,
	pub password: SecretString,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
	pub token: String,
	pub actor: Identity,
	pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
	pub actor: Identity,
	pub expires_at: DateTime<Utc>,
	pub step_up: StepUpState,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPasswordRequest {
	pub password: SecretString,
}

#[derive(Debug, Serialize)]
pub struct VerifyPasswordResponse {
	pub verified: bool,
	pub expires_at: DateTime<Utc>,
}

pub async fn login(
	State(state): State<AppState>,
	Json(body): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
	let session = state
		.directory
		.login(&body.username, &body.password)
		.await
		.map_err(|e| match e {
			AuthError::InvalidCredentials | AuthError::UnknownUser(_) => ApiError::InvalidLogin,
			other => CredentialError::Internal(format!("login failed: {other}")).into(),
		})?;

	Ok(Json(LoginResponse {
		token: session.token.expose().clone(),
		actor: session.context.identity,
		expires_at: session.context.session_expires_at,
	}))
}

pub async fn current_session(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
) -> Json<SessionResponse> {
	let step_up = state.credentials.step_up_state(&ctx);
	Json(SessionResponse {
		actor: ctx.identity,
		expires_at: ctx.session_expires_at,
		step_up,
	})
}

/// Ends the session even when the logout entry cannot be recorded; the
/// audit error is still returned.
pub async fn logout(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
	BearerToken(token): BearerToken,
) -> ApiResult<StatusCode> {
	let recorded = state.credentials.logout(&ctx).await;
	state.directory.logout(&token);
	recorded?;
	Ok(StatusCode::NO_CONTENT)
}

pub async fn verify_password(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
	Json(body): Json<VerifyPasswordRequest>,
) -> ApiResult<Json<VerifyPasswordResponse>> {
	let session = state.credentials.verify_password(&ctx, &body.password).await?;
	Ok(Json(VerifyPasswordResponse {
		verified: true,
		expires_at: session.expires_at,
	}))
}
