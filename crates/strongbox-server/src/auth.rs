// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request authentication.
//!
//! The caller is identified by `Authorization: Bearer <session token>`,
//! resolved through the configured [`IdentityProvider`].
//!
//! [`IdentityProvider`]: strongbox_auth::IdentityProvider

use axum::{
	extract::FromRequestParts,
	http::{header::AUTHORIZATION, request::Parts},
};
use strongbox_auth::ActorContext;
use strongbox_common_secret::SecretString;
use strongbox_credentials::CredentialError;
use tracing::instrument;

use crate::api::AppState;
use crate::error::ApiError;

/// The raw session token from the `Authorization` header.
pub struct BearerToken(pub SecretString);

impl<S> FromRequestParts<S> for BearerToken
where
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		extract_bearer_token(parts)
			.map(BearerToken)
			.ok_or(ApiError::Unauthorized)
	}
}

/// Extractor that requires a live session.
///
/// ```ignore
/// async fn handler(RequireActor(ctx): RequireActor) -> impl IntoResponse {
///     format!("hello {}", ctx.identity.display_name)
/// }
/// ```
pub struct RequireActor(pub ActorContext);

impl FromRequestParts<AppState> for RequireActor {
	type Rejection = ApiError;

	#[instrument(name = "RequireActor::from_request_parts", skip_all)]
	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		let Some(token) = extract_bearer_token(parts) else {
			tracing::debug!("no bearer token");
			return Err(ApiError::Unauthorized);
		};

		match state.identity.current_actor(&token).await {
			Ok(Some(ctx)) => {
				tracing::debug!(actor = %ctx.actor_id(), "request authenticated");
				Ok(RequireActor(ctx))
			}
			Ok(None) => {
				tracing::debug!("unknown or expired session");
				Err(ApiError::Unauthorized)
			}
			Err(e) => Err(CredentialError::Internal(format!("identity provider failed: {e}")).into()),
		}
	}
}

fn extract_bearer_token(parts: &Parts) -> Option<SecretString> {
	let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
	let token = value
		.strip_prefix("Bearer ")
		.or_else(|| value.strip_prefix("bearer "))?
		.trim();
	if token.is_empty() {
		return None;
	}
	Some(SecretString::from(token))
}
