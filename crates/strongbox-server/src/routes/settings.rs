// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{extract::State, Json};
use strongbox_config::Settings;
use strongbox_credentials::EffectiveSettings;

use crate::api::AppState;
use crate::auth::RequireActor;
use crate::error::ApiResult;

pub async fn get_settings(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
) -> ApiResult<Json<EffectiveSettings>> {
	Ok(Json(state.credentials.get_effective_settings(&ctx).await?))
}

pub async fn update_settings(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
	Json(settings): Json<Settings>,
) -> ApiResult<Json<EffectiveSettings>> {
	Ok(Json(state.credentials.update_settings(&ctx, settings).await?))
}
