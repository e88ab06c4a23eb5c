// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credentials capability management. Administrators only.

use axum::{
	extract::{Path, State},
	Json,
};
use serde::Serialize;
use strongbox_auth::{AccessEntry, ActorId};

use crate::api::AppState;
use crate::auth::RequireActor;
use crate::error::ApiResult;

#[derive(Debug, Serialize)]
pub struct ListAccessResponse {
	pub users: Vec<AccessEntry>,
}

pub async fn list_access(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
) -> ApiResult<Json<ListAccessResponse>> {
	let users = state.credentials.list_access(&ctx).await?;
	Ok(Json(ListAccessResponse { users }))
}

pub async fn grant_access(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
	Path(user): Path<String>,
) -> ApiResult<Json<AccessEntry>> {
	let user = ActorId::new(user);
	Ok(Json(state.credentials.grant_access(&ctx, &user).await?))
}

pub async fn revoke_access(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
	Path(user): Path<String>,
) -> ApiResult<Json<AccessEntry>> {
	let user = ActorId::new(user);
	Ok(Json(state.credentials.revoke_access(&ctx, &user).await?))
}
