// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Test helpers shared by downstream crates.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::DbError;
use crate::pool::run_migrations;

/// Migrated in-memory database. A single connection, because every
/// `:memory:` connection is its own database.
pub async fn create_test_pool() -> Result<SqlitePool, DbError> {
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect(":memory:")
		.await?;
	run_migrations(&pool).await?;
	Ok(pool)
}
