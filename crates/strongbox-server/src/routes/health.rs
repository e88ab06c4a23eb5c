// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use strongbox_jobs::HealthState;

use crate::api::AppState;
use crate::health::{self, HealthComponents, HealthResponse};

/// GET /health - liveness plus encryption availability. Unauthenticated.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let (database, jobs) = tokio::join!(
		health::check_database(&state.pool),
		health::check_jobs(state.scheduler.as_ref()),
	);
	let components = HealthComponents {
		database,
		encryption: health::check_encryption(&state.credentials),
		jobs,
	};

	let status = health::aggregate_status(&components);
	let response = HealthResponse {
		status,
		timestamp: chrono::Utc::now().to_rfc3339(),
		version: env!("CARGO_PKG_VERSION"),
		components,
	};

	let http_status = match status {
		HealthState::Healthy | HealthState::Degraded => StatusCode::OK,
		HealthState::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
	};
	(http_status, Json(response))
}
