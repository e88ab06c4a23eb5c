// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Single-row settings store.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use strongbox_config::{Settings, SettingsError, SettingsProvider};
use tracing::{debug, info, instrument};

use crate::error::{DbError, Result};

#[derive(Debug, Clone)]
pub struct SqliteSettingsStore {
	pool: SqlitePool,
	defaults: Settings,
}

impl SqliteSettingsStore {
	/// `defaults` is returned until something has been stored.
	pub fn new(pool: SqlitePool, defaults: Settings) -> Self {
		Self { pool, defaults }
	}

	/// Write `defaults` if the store is empty. Existing values are kept.
	#[instrument(skip(self))]
	pub async fn seed(&self) -> Result<()> {
		self
			.defaults
			.validate()
			.map_err(|e| DbError::Internal(e.to_string()))?;
		let result = sqlx::query(
			r#"
			INSERT OR IGNORE INTO settings (id, require_password_verification, audit_log_retention_days, updated_at)
			VALUES (1, ?, ?, ?)
			"#,
		)
		.bind(self.defaults.require_password_verification)
		.bind(i64::from(self.defaults.audit_log_retention_days))
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;
		if result.rows_affected() > 0 {
			info!(?self.defaults, "settings seeded");
		}
		Ok(())
	}

	#[instrument(skip(self))]
	pub async fn load(&self) -> Result<Settings> {
		let row = sqlx::query(
			"SELECT require_password_verification, audit_log_retention_days FROM settings WHERE id = 1",
		)
		.fetch_optional(&self.pool)
		.await?;

		let Some(row) = row else {
			debug!("settings not stored yet, using defaults");
			return Ok(self.defaults);
		};

		let days: i64 = row.try_get("audit_log_retention_days")?;
		Ok(Settings {
			require_password_verification: row.try_get("require_password_verification")?,
			audit_log_retention_days: u32::try_from(days)
				.map_err(|_| DbError::Internal(format!("invalid stored retention {days}")))?,
		})
	}

	#[instrument(skip(self))]
	pub async fn store(&self, settings: Settings) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO settings (id, require_password_verification, audit_log_retention_days, updated_at)
			VALUES (1, ?, ?, ?)
			ON CONFLICT(id) DO UPDATE SET
				require_password_verification = excluded.require_password_verification,
				audit_log_retention_days = excluded.audit_log_retention_days,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(settings.require_password_verification)
		.bind(i64::from(settings.audit_log_retention_days))
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;
		info!(?settings, "settings updated");
		Ok(())
	}
}

#[async_trait]
impl SettingsProvider for SqliteSettingsStore {
	async fn get_settings(&self) -> std::result::Result<Settings, SettingsError> {
		self
			.load()
			.await
			.map_err(|e| SettingsError::Unavailable(e.to_string()))
	}

	async fn update_settings(
		&self,
		settings: Settings,
	) -> std::result::Result<Settings, SettingsError> {
		settings.validate()?;
		self
			.store(settings)
			.await
			.map_err(|e| SettingsError::Unavailable(e.to_string()))?;
		Ok(settings)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	const SEED: Settings = Settings {
		require_password_verification: true,
		audit_log_retention_days: 30,
	};

	#[tokio::test]
	async fn unseeded_store_returns_defaults() {
		let store = SqliteSettingsStore::new(create_test_pool().await.unwrap(), SEED);
		assert_eq!(store.get_settings().await.unwrap(), SEED);
	}

	#[tokio::test]
	async fn seed_does_not_overwrite() {
		let pool = create_test_pool().await.unwrap();
		let store = SqliteSettingsStore::new(pool.clone(), SEED);
		store.seed().await.unwrap();

		let changed = Settings {
			require_password_verification: false,
			audit_log_retention_days: 0,
		};
		store.update_settings(changed).await.unwrap();

		let restarted = SqliteSettingsStore::new(pool, SEED);
		restarted.seed().await.unwrap();
		assert_eq!(restarted.get_settings().await.unwrap(), changed);
	}

	#[tokio::test]
	async fn update_rejects_invalid_retention() {
		let store = SqliteSettingsStore::new(create_test_pool().await.unwrap(), SEED);
		let err = store
			.update_settings(Settings {
				require_password_verification: false,
				audit_log_retention_days: 366,
			})
			.await
			.unwrap_err();
		assert!(matches!(err, SettingsError::Invalid(_)));
		assert_eq!(store.get_settings().await.unwrap(), SEED);
	}

	#[tokio::test]
	async fn file_backed_store_persists() {
		let dir = tempfile::tempdir().unwrap();
		let url = format!("sqlite:{}", dir.path().join("settings.db").display());

		let pool = crate::pool::create_pool(&url).await.unwrap();
		crate::pool::run_migrations(&pool).await.unwrap();
		SqliteSettingsStore::new(pool.clone(), SEED)
			.update_settings(Settings {
				require_password_verification: false,
				audit_log_retention_days: 7,
			})
			.await
			.unwrap();
		pool.close().await;

		let pool = crate::pool::create_pool(&url).await.unwrap();
		let store = SqliteSettingsStore::new(pool, SEED);
		assert_eq!(store.get_settings().await.unwrap().audit_log_retention_days, 7);
	}
}
