// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::context::{CancellationToken, JobContext};
use crate::error::{JobError, Result};
use crate::health::{HealthState, JobHealth, SchedulerHealth};
use crate::history::RunHistory;
use crate::job::Job;
use crate::types::{JobRun, JobStatus, JobType, TriggerSource};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

const BASE_RETRY_DELAY_SECS: u64 = 1;
const MAX_RETRY_DELAY_SECS: u64 = 60;
const RETRY_FACTOR: f64 = 2.0;
const MAX_RETRIES: u32 = 3;
const MAX_JITTER_MS: u64 = 250;

struct RegisteredJob {
	job: Arc<dyn Job>,
	job_type: JobType,
	cancellation_token: CancellationToken,
}

pub struct JobScheduler {
	jobs: HashMap<String, RegisteredJob>,
	history: Arc<RunHistory>,
	shutdown_tx: broadcast::Sender<()>,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for JobScheduler {
	fn default() -> Self {
		Self::new()
	}
}

impl JobScheduler {
	pub fn new() -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			jobs: HashMap::new(),
			history: Arc::new(RunHistory::new()),
			shutdown_tx,
			handles: Mutex::new(Vec::new()),
		}
	}

	/// Run `job` every `interval`. With `run_at_start` it also runs as soon
	/// as the scheduler starts.
	pub fn register_periodic(&mut self, job: Arc<dyn Job>, interval: Duration, run_at_start: bool) {
		let id = job.id().to_string();
		self.jobs.insert(
			id,
			RegisteredJob {
				job,
				job_type: JobType::Periodic {
					interval,
					run_at_start,
				},
				cancellation_token: CancellationToken::new(),
			},
		);
	}

	#[instrument(skip(self))]
	pub async fn start(&self) {
		let mut handles = self.handles.lock().await;
		if !handles.is_empty() {
			warn!("Job scheduler already started");
			return;
		}

		for (job_id, registered) in &self.jobs {
			let JobType::Periodic {
				interval,
				run_at_start,
			} = registered.job_type;
			let job = Arc::clone(&registered.job);
			let history = Arc::clone(&self.history);
			let mut shutdown_rx = self.shutdown_tx.subscribe();
			let cancellation_token = registered.cancellation_token.clone();
			let job_id = job_id.clone();

			let handle = tokio::spawn(async move {
				if run_at_start {
					let _ =
						run_job_with_retry(&job, &history, TriggerSource::Startup, &cancellation_token).await;
				}
				loop {
					tokio::select! {
						_ = tokio::time::sleep(interval) => {
							if cancellation_token.is_cancelled() {
								continue;
							}
							let _ = run_job_with_retry(
								&job,
								&history,
								TriggerSource::Schedule,
								&cancellation_token,
							).await;
						}
						_ = shutdown_rx.recv() => {
							info!(job_id = %job_id, "Shutting down periodic job");
							break;
						}
					}
				}
			});

			handles.push(handle);
		}

		info!(job_count = handles.len(), "Job scheduler started");
	}

	/// Run a job now, outside its schedule, and wait for it to finish.
	/// Returns the run id.
	#[instrument(skip(self))]
	pub async fn trigger_job(&self, job_id: &str) -> Result<String> {
		let registered = self
			.jobs
			.get(job_id)
			.ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

		run_job_with_retry(
			&registered.job,
			&self.history,
			TriggerSource::Manual,
			&registered.cancellation_token,
		)
		.await
	}

	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		for registered in self.jobs.values() {
			registered.cancellation_token.cancel();
		}
		let _ = self.shutdown_tx.send(());

		let mut handles = self.handles.lock().await;
		for handle in handles.drain(..) {
			let _ = handle.await;
		}

		info!("Job scheduler shut down");
	}

	pub fn history(&self) -> &Arc<RunHistory> {
		&self.history
	}

	pub async fn job_status(&self, job_id: &str) -> Option<JobHealth> {
		let registered = self.jobs.get(job_id)?;
		let consecutive_failures = self.history.consecutive_failures(job_id).await;

		Some(JobHealth {
			job_id: job_id.to_string(),
			name: registered.job.name().to_string(),
			state: HealthState::from_failures(consecutive_failures),
			consecutive_failures,
			stopped: registered.cancellation_token.is_cancelled(),
			last_run: self.history.last_run(job_id).await,
		})
	}

	pub async fn health_status(&self) -> SchedulerHealth {
		let mut jobs = Vec::with_capacity(self.jobs.len());
		for job_id in self.jobs.keys() {
			if let Some(status) = self.job_status(job_id).await {
				jobs.push(status);
			}
		}
		SchedulerHealth::from_jobs(jobs)
	}
}

async fn run_job_with_retry(
	job: &Arc<dyn Job>,
	history: &RunHistory,
	triggered_by: TriggerSource,
	cancellation_token: &CancellationToken,
) -> Result<String> {
	let mut retry_count = 0u32;
	let run_id = uuid::Uuid::new_v4().to_string();

	history
		.record_start(JobRun {
			id: run_id.clone(),
			job_id: job.id().to_string(),
			status: JobStatus::Running,
			started_at: Utc::now(),
			completed_at: None,
			duration_ms: None,
			error_message: None,
			retry_count,
			triggered_by,
			metadata: None,
		})
		.await;

	loop {
		let ctx = JobContext {
			run_id: run_id.clone(),
			triggered_by: if retry_count > 0 {
				TriggerSource::Retry
			} else {
				triggered_by
			},
			cancellation_token: cancellation_token.clone(),
		};

		match job.run(&ctx).await {
			Ok(output) => {
				history
					.record_complete(
						job.id(),
						&run_id,
						JobStatus::Succeeded,
						retry_count,
						None,
						output.metadata,
					)
					.await;
				info!(job_id = %job.id(), run_id = %run_id, message = %output.message, "Job completed successfully");
				return Ok(run_id);
			}
			Err(JobError::Cancelled) => {
				history
					.record_complete(job.id(), &run_id, JobStatus::Cancelled, retry_count, None, None)
					.await;
				info!(job_id = %job.id(), run_id = %run_id, "Job cancelled");
				return Err(JobError::Cancelled);
			}
			Err(JobError::Failed { message, retryable }) => {
				if retryable && retry_count < MAX_RETRIES && !cancellation_token.is_cancelled() {
					retry_count += 1;
					let delay = backoff_with_jitter(retry_count);
					warn!(
						job_id = %job.id(),
						run_id = %run_id,
						retry_count,
						delay_ms = delay.as_millis() as u64,
						error = %message,
						"Job failed, retrying"
					);
					tokio::time::sleep(delay).await;
					continue;
				}

				history
					.record_complete(
						job.id(),
						&run_id,
						JobStatus::Failed,
						retry_count,
						Some(message.clone()),
						None,
					)
					.await;
				warn!(job_id = %job.id(), run_id = %run_id, error = %message, "Job failed");
				return Err(JobError::Failed { message, retryable });
			}
			Err(e) => {
				let message = e.to_string();
				history
					.record_complete(
						job.id(),
						&run_id,
						JobStatus::Failed,
						retry_count,
						Some(message.clone()),
						None,
					)
					.await;
				warn!(job_id = %job.id(), run_id = %run_id, error = %message, "Job failed with error");
				return Err(e);
			}
		}
	}
}

pub(crate) fn calculate_backoff_delay(retry_count: u32) -> u64 {
	let delay = BASE_RETRY_DELAY_SECS as f64 * RETRY_FACTOR.powi(retry_count as i32 - 1);
	(delay as u64).min(MAX_RETRY_DELAY_SECS)
}

fn backoff_with_jitter(retry_count: u32) -> Duration {
	Duration::from_secs(calculate_backoff_delay(retry_count))
		+ Duration::from_millis(fastrand::u64(0..MAX_JITTER_MS))
}
