// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory run history backing the health report.

use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

use crate::types::{JobRun, JobStatus};

/// Runs kept per job, newest first.
pub const MAX_RUNS_PER_JOB: usize = 20;

#[derive(Debug, Default)]
pub struct RunHistory {
	runs: Mutex<HashMap<String, VecDeque<JobRun>>>,
}

impl RunHistory {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn record_start(&self, run: JobRun) {
		let mut runs = self.runs.lock().await;
		let job_runs = runs.entry(run.job_id.clone()).or_default();
		job_runs.push_front(run);
		job_runs.truncate(MAX_RUNS_PER_JOB);
	}

	pub async fn record_complete(
		&self,
		job_id: &str,
		run_id: &str,
		status: JobStatus,
		retry_count: u32,
		error_message: Option<String>,
		metadata: Option<serde_json::Value>,
	) {
		let mut runs = self.runs.lock().await;
		let Some(run) = runs
			.get_mut(job_id)
			.and_then(|job_runs| job_runs.iter_mut().find(|r| r.id == run_id))
		else {
			return;
		};
		let now = Utc::now();
		run.status = status;
		run.completed_at = Some(now);
		run.duration_ms = Some((now - run.started_at).num_milliseconds());
		run.retry_count = retry_count;
		run.error_message = error_message;
		run.metadata = metadata;
	}

	pub async fn last_run(&self, job_id: &str) -> Option<JobRun> {
		self
			.runs
			.lock()
			.await
			.get(job_id)
			.and_then(|job_runs| job_runs.front().cloned())
	}

	/// Newest first.
	pub async fn runs(&self, job_id: &str) -> Vec<JobRun> {
		self
			.runs
			.lock()
			.await
			.get(job_id)
			.map(|job_runs| job_runs.iter().cloned().collect())
			.unwrap_or_default()
	}

	/// Failed runs since the last run that did not fail.
	pub async fn consecutive_failures(&self, job_id: &str) -> u32 {
		let runs = self.runs.lock().await;
		let Some(job_runs) = runs.get(job_id) else {
			return 0;
		};
		job_runs
			.iter()
			.filter(|r| r.status != JobStatus::Running)
			.take_while(|r| r.status == JobStatus::Failed)
			.count() as u32
	}
}
