// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stored capability grants.
//!
//! One row per `(username, capability)`. A row with `granted = 0` is an
//! explicit revocation and overrides a grant from configuration.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use strongbox_auth::{ActorId, AuthError, AuthResult, Capability, GrantStore};
use tracing::{info, instrument};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct SqliteGrantStore {
	pool: SqlitePool,
}

impl SqliteGrantStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[instrument(skip(self))]
	pub async fn load(&self, capability: Capability) -> Result<Vec<(ActorId, bool)>> {
		let rows = sqlx::query(
			"SELECT username, granted FROM capability_grants WHERE capability = ? ORDER BY username",
		)
		.bind(capability.as_str())
		.fetch_all(&self.pool)
		.await?;

		rows
			.iter()
			.map(|row| -> Result<(ActorId, bool)> {
				let username: String = row.try_get("username")?;
				Ok((ActorId::new(username), row.try_get("granted")?))
			})
			.collect()
	}

	#[instrument(skip(self))]
	pub async fn store(&self, user: &ActorId, capability: Capability, granted: bool) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO capability_grants (username, capability, granted, updated_at)
			VALUES (?, ?, ?, ?)
			ON CONFLICT(username, capability) DO UPDATE SET
				granted = excluded.granted,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(user.as_str())
		.bind(capability.as_str())
		.bind(granted)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;
		info!(%user, %capability, granted, "capability grant stored");
		Ok(())
	}
}

#[async_trait]
impl GrantStore for SqliteGrantStore {
	async fn load_grants(&self, capability: Capability) -> AuthResult<Vec<(ActorId, bool)>> {
		self
			.load(capability)
			.await
			.map_err(|e| AuthError::Provider(e.to_string()))
	}

	async fn store_grant(
		&self,
		user: &ActorId,
		capability: Capability,
		granted: bool,
	) -> AuthResult<()> {
		self
			.store(user, capability, granted)
			.await
			.map_err(|e| AuthError::Provider(e.to_string()))
	}
}
