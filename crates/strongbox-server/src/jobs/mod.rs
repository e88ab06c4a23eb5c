// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod audit_retention;
pub mod session_prune;

use std::sync::Arc;
use std::time::Duration;

use strongbox_config::JobsConfig;
use strongbox_jobs::JobScheduler;

use crate::api::AppState;

pub use audit_retention::AuditRetentionJob;
pub use session_prune::SessionPruneJob;

/// Register the maintenance jobs. The scheduler is returned unstarted.
pub fn build_scheduler(state: &AppState, config: &JobsConfig) -> JobScheduler {
	let mut scheduler = JobScheduler::new();
	scheduler.register_periodic(
		Arc::new(AuditRetentionJob::new(
			state.audit.clone(),
			state.settings.clone(),
			config.audit_cleanup_batch_size,
		)),
		Duration::from_secs(config.audit_cleanup_interval_secs),
		true,
	);
	scheduler.register_periodic(
		Arc::new(SessionPruneJob::new(
			state.directory.clone(),
			state.credentials.gate().clone(),
		)),
		Duration::from_secs(config.session_prune_interval_secs),
		false,
	);
	scheduler
}
