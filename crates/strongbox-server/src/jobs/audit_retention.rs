// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use strongbox_audit::SqliteAuditLog;
use strongbox_config::SettingsProvider;
use strongbox_jobs::{Job, JobContext, JobError, JobOutput};
use tracing::instrument;

/// Deletes audit entries older than the configured retention. The retention
/// is read from the settings provider on every run.
pub struct AuditRetentionJob {
	audit: SqliteAuditLog,
	settings: Arc<dyn SettingsProvider>,
	batch_size: u32,
}

impl AuditRetentionJob {
	pub fn new(audit: SqliteAuditLog, settings: Arc<dyn SettingsProvider>, batch_size: u32) -> Self {
		Self {
			audit,
			settings,
			batch_size,
		}
	}
}

#[async_trait]
impl Job for AuditRetentionJob {
	fn id(&self) -> &str {
		"audit-retention"
	}

	fn name(&self) -> &str {
		"Audit Retention"
	}

	fn description(&self) -> &str {
		"Delete audit log entries older than the retention period"
	}

	#[instrument(skip(self, ctx), fields(job_id = "audit-retention"))]
	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
		ctx.check_cancelled()?;

		let settings = self
			.settings
			.get_settings()
			.await
			.map_err(|e| JobError::retryable(e.to_string()))?;
		let retention_days = settings.audit_log_retention_days;

		if retention_days == 0 {
			return Ok(JobOutput {
				message: "Audit retention disabled".to_string(),
				metadata: Some(serde_json::json!({ "retention_days": 0, "deleted": 0 })),
			});
		}

		let deleted = self
			.audit
			.cleanup(retention_days, self.batch_size)
			.await
			.map_err(|e| JobError::retryable(e.to_string()))?;

		tracing::info!(deleted, retention_days, "audit retention completed");

		Ok(JobOutput {
			message: format!("Deleted {deleted} audit entries"),
			metadata: Some(serde_json::json!({
				"retention_days": retention_days,
				"deleted": deleted,
			})),
		})
	}
}
