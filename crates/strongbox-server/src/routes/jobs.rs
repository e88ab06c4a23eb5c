// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{
	extract::{Path, State},
	Json,
};
use serde::Serialize;
use strongbox_jobs::{JobError, JobHealth};
use tracing::info;

use crate::api::AppState;
use crate::auth::RequireActor;
use crate::error::ApiResult;

#[derive(Debug, Serialize)]
pub struct RunJobResponse {
	pub run_id: String,
	pub job: JobHealth,
}

/// POST /api/jobs/{id}/run - run a maintenance job now and wait for it.
/// Administrators only.
pub async fn run_job(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
	Path(job_id): Path<String>,
) -> ApiResult<Json<RunJobResponse>> {
	state.credentials.gate().require_admin(&ctx).await?;
	let scheduler = state
		.scheduler
		.as_ref()
		.ok_or_else(|| JobError::NotFound(job_id.clone()))?;

	info!(actor = %ctx.actor_id(), %job_id, "manual job run requested");
	let run_id = scheduler.trigger_job(&job_id).await?;
	let job = scheduler
		.job_status(&job_id)
		.await
		.ok_or_else(|| JobError::NotFound(job_id.clone()))?;
	Ok(Json(RunJobResponse { run_id, job }))
}
