// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Component health checks behind `GET /health`.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sqlx::SqlitePool;
use strongbox_credentials::CredentialService;
use strongbox_jobs::{HealthState, JobScheduler, SchedulerHealth};
use tokio::time::{timeout, Instant};

const DB_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
	pub status: HealthState,
	pub latency_ms: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EncryptionHealth {
	pub status: HealthState,
	pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthComponents {
	pub database: DatabaseHealth,
	pub encryption: EncryptionHealth,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub jobs: Option<SchedulerHealth>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: HealthState,
	pub timestamp: String,
	pub version: &'static str,
	pub components: HealthComponents,
}

pub async fn check_database(pool: &SqlitePool) -> DatabaseHealth {
	let start = Instant::now();
	let result = timeout(DB_CHECK_TIMEOUT, sqlx::query("SELECT 1").execute(pool)).await;
	let latency_ms = start.elapsed().as_millis() as u64;

	match result {
		Ok(Ok(_)) => DatabaseHealth {
			status: HealthState::Healthy,
			latency_ms,
			error: None,
		},
		Ok(Err(e)) => DatabaseHealth {
			status: HealthState::Unhealthy,
			latency_ms,
			error: Some(e.to_string()),
		},
		Err(_) => DatabaseHealth {
			status: HealthState::Unhealthy,
			latency_ms,
			error: Some("database health check timed out".to_string()),
		},
	}
}

/// Degraded mode keeps the server up, so a missing key is never unhealthy.
pub fn check_encryption(credentials: &CredentialService) -> EncryptionHealth {
	let available = credentials.encryption_available();
	EncryptionHealth {
		status: if available {
			HealthState::Healthy
		} else {
			HealthState::Degraded
		},
		available,
	}
}

pub async fn check_jobs(scheduler: Option<&Arc<JobScheduler>>) -> Option<SchedulerHealth> {
	Some(scheduler?.health_status().await)
}

pub fn aggregate_status(components: &HealthComponents) -> HealthState {
	let jobs = components
		.jobs
		.as_ref()
		.map(|j| j.state)
		.unwrap_or(HealthState::Healthy);
	[components.database.status, components.encryption.status, jobs]
		.into_iter()
		.max()
		.unwrap_or(HealthState::Healthy)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn components(database: HealthState, encryption: HealthState) -> HealthComponents {
		HealthComponents {
			database: DatabaseHealth {
				status: database,
				latency_ms: 0,
				error: None,
			},
			encryption: EncryptionHealth {
				status: encryption,
				available: encryption == HealthState::Healthy,
			},
			jobs: None,
		}
	}

	#[test]
	fn worst_component_wins() {
		assert_eq!(
			aggregate_status(&components(HealthState::Healthy, HealthState::Healthy)),
			HealthState::Healthy
		);
		assert_eq!(
			aggregate_status(&components(HealthState::Healthy, HealthState::Degraded)),
			HealthState::Degraded
		);
		assert_eq!(
			aggregate_status(&components(HealthState::Unhealthy, HealthState::Degraded)),
			HealthState::Unhealthy
		);
	}

	#[tokio::test]
	async fn database_check_succeeds_on_live_pool() {
		let pool = strongbox_db::testing::create_test_pool().await.unwrap();
		let health = check_database(&pool).await;
		assert_eq!(health.status, HealthState::Healthy);
		assert!(health.error.is_none());
	}
}
