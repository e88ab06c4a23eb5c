// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::context::JobContext;
use crate::error::JobError;
use crate::types::JobOutput;

/// A unit of background work. Runs must be idempotent: a missed or retried
/// run simply does the work again.
#[async_trait]
pub trait Job: Send + Sync {
	/// Stable identifier, unique within a scheduler.
	fn id(&self) -> &str;

	fn name(&self) -> &str;

	fn description(&self) -> &str;

	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError>;
}
