// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Serialize;

use crate::types::JobRun;

/// Ordered so the worst state of a set is its `max()`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
	Healthy,
	Degraded,
	Unhealthy,
}

impl HealthState {
	/// One failed run degrades, three in a row is unhealthy.
	pub fn from_failures(consecutive_failures: u32) -> Self {
		match consecutive_failures {
			0 => HealthState::Healthy,
			1..=2 => HealthState::Degraded,
			_ => HealthState::Unhealthy,
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct JobHealth {
	pub job_id: String,
	pub name: String,
	pub state: HealthState,
	pub consecutive_failures: u32,
	/// Set once the scheduler has shut down; no further runs happen.
	pub stopped: bool,
	pub last_run: Option<JobRun>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerHealth {
	pub state: HealthState,
	pub jobs: Vec<JobHealth>,
}

impl SchedulerHealth {
	pub fn from_jobs(mut jobs: Vec<JobHealth>) -> Self {
		jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));
		let state = jobs
			.iter()
			.map(|j| j.state)
			.max()
			.unwrap_or(HealthState::Healthy);
		Self { state, jobs }
	}
}
