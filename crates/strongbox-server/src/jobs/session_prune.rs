// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use strongbox_auth::LocalDirectory;
use strongbox_credentials::AccessGate;
use strongbox_jobs::{Job, JobContext, JobError, JobOutput};
use tracing::instrument;

/// Drops login sessions and step-up verifications that expired without being
/// presented again.
pub struct SessionPruneJob {
	directory: Arc<LocalDirectory>,
	gate: Arc<AccessGate>,
}

impl SessionPruneJob {
	pub fn new(directory: Arc<LocalDirectory>, gate: Arc<AccessGate>) -> Self {
		Self { directory, gate }
	}
}

#[async_trait]
impl Job for SessionPruneJob {
	fn id(&self) -> &str {
		"session-prune"
	}

	fn name(&self) -> &str {
		"Session Prune"
	}

	fn description(&self) -> &str {
		"Remove expired sessions and step-up verifications from memory"
	}

	#[instrument(skip(self, ctx), fields(job_id = "session-prune"))]
	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
		ctx.check_cancelled()?;

		let now = Utc::now();
		let sessions = self.directory.prune_expired(now);
		let step_ups = self.gate.step_up().prune_expired(now);

		tracing::info!(sessions, step_ups, "expired sessions pruned");

		Ok(JobOutput {
			message: format!("Pruned {sessions} sessions and {step_ups} step-up verifications"),
			metadata: Some(serde_json::json!({
				"sessions": sessions,
				"step_ups": step_ups,
			})),
		})
	}
}
