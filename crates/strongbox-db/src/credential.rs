// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential persistence.
//!
//! The repository stores rows exactly as given: it never sees plaintext, and
//! it does not interpret `kind`. Mutations take a connection so callers can
//! put the audit entry in the same transaction.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::error::{DbError, Result};

/// A persisted credential row. `encrypted_payload` is `nonce || ciphertext || tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
	pub id: Uuid,
	pub label: String,
	pub kind: String,
	pub encrypted_payload: Vec<u8>,
	pub key_id: u32,
	pub url: Option<String>,
	pub notes: Option<String>,
	pub created_by: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	/// Incremented on every update.
	pub version: i64,
}

const SELECT_COLUMNS: &str = "id, label, kind, encrypted_payload, key_id, url, notes, \
	created_by, created_at, updated_at, version";

#[derive(Debug, Clone)]
pub struct CredentialRepository {
	pool: SqlitePool,
}

impl CredentialRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	#[tracing::instrument(skip(self))]
	pub async fn get(&self, id: Uuid) -> Result<Option<CredentialRecord>> {
		fetch_one(&self.pool, id).await
	}

	/// All rows, ordered by label then id.
	#[tracing::instrument(skip(self))]
	pub async fn list(&self) -> Result<Vec<CredentialRecord>> {
		let sql = format!("SELECT {SELECT_COLUMNS} FROM credentials ORDER BY label COLLATE NOCASE, id");
		let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
		rows.iter().map(record_from_row).collect()
	}

	#[tracing::instrument(skip(self, conn, record), fields(id = %record.id))]
	pub async fn insert_in(&self, conn: &mut SqliteConnection, record: &CredentialRecord) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO credentials (
				id, label, kind, encrypted_payload, key_id, url, notes,
				created_by, created_at, updated_at, version
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(record.id.to_string())
		.bind(&record.label)
		.bind(&record.kind)
		.bind(&record.encrypted_payload)
		.bind(i64::from(record.key_id))
		.bind(record.url.as_deref())
		.bind(record.notes.as_deref())
		.bind(&record.created_by)
		.bind(record.created_at.to_rfc3339())
		.bind(record.updated_at.to_rfc3339())
		.bind(record.version)
		.execute(conn)
		.await
		.map_err(|e| {
			if let sqlx::Error::Database(db) = &e {
				if db.is_unique_violation() {
					return DbError::Conflict(format!("credential {} already exists", record.id));
				}
			}
			DbError::Sqlx(e)
		})?;
		Ok(())
	}

	/// Replace a row if it is still at `expected_version`. The new row's
	/// `version` must already be bumped by the caller.
	#[tracing::instrument(skip(self, conn, record), fields(id = %record.id))]
	pub async fn update_in(
		&self,
		conn: &mut SqliteConnection,
		record: &CredentialRecord,
		expected_version: i64,
	) -> Result<()> {
		let result = sqlx::query(
			r#"
			UPDATE credentials
			SET label = ?, kind = ?, encrypted_payload = ?, key_id = ?, url = ?, notes = ?,
				updated_at = ?, version = ?
			WHERE id = ? AND version = ?
			"#,
		)
		.bind(&record.label)
		.bind(&record.kind)
		.bind(&record.encrypted_payload)
		.bind(i64::from(record.key_id))
		.bind(record.url.as_deref())
		.bind(record.notes.as_deref())
		.bind(record.updated_at.to_rfc3339())
		.bind(record.version)
		.bind(record.id.to_string())
		.bind(expected_version)
		.execute(&mut *conn)
		.await?;

		if result.rows_affected() == 1 {
			return Ok(());
		}

		match fetch_one(&mut *conn, record.id).await? {
			Some(current) => Err(DbError::Conflict(format!(
				"credential {} changed concurrently (expected version {expected_version}, found {})",
				record.id, current.version
			))),
			None => Err(DbError::NotFound(format!("credential {}", record.id))),
		}
	}

	#[tracing::instrument(skip(self, conn))]
	pub async fn delete_in(&self, conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
		let result = sqlx::query("DELETE FROM credentials WHERE id = ?")
			.bind(id.to_string())
			.execute(conn)
			.await?;
		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("credential {id}")));
		}
		Ok(())
	}
}

async fn fetch_one<'c, E>(executor: E, id: Uuid) -> Result<Option<CredentialRecord>>
where
	E: SqliteExecutor<'c>,
{
	let sql = format!("SELECT {SELECT_COLUMNS} FROM credentials WHERE id = ?");
	let row = sqlx::query(&sql)
		.bind(id.to_string())
		.fetch_optional(executor)
		.await?;
	row.as_ref().map(record_from_row).transpose()
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("invalid {column} '{value}': {e}")))
}

fn record_from_row(row: &SqliteRow) -> Result<CredentialRecord> {
	let id: String = row.try_get("id")?;
	let id = Uuid::parse_str(&id).map_err(|e| DbError::Internal(format!("invalid id '{id}': {e}")))?;
	let key_id: i64 = row.try_get("key_id")?;
	let key_id = u32::try_from(key_id)
		.map_err(|_| DbError::Internal(format!("invalid key_id {key_id} for credential {id}")))?;
	let created_at: String = row.try_get("created_at")?;
	let updated_at: String = row.try_get("updated_at")?;

	Ok(CredentialRecord {
		id,
		label: row.try_get("label")?,
		kind: row.try_get("kind")?,
		encrypted_payload: row.try_get("encrypted_payload")?,
		key_id,
		url: row.try_get("url")?,
		notes: row.try_get("notes")?,
		created_by: row.try_get("created_by")?,
		created_at: parse_timestamp("created_at", &created_at)?,
		updated_at: parse_timestamp("updated_at", &updated_at)?,
		version: row.try_get("version")?,
	})
}
