// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite-backed audit ledger.
//!
//! Rows live in `audit_entries` (created by the `strongbox-db` migrations).
//! `id` is `INTEGER PRIMARY KEY AUTOINCREMENT`, so ids are strictly
//! increasing and never reused even after retention deletes the tail.
//! Timestamps are stored as fixed-width RFC 3339 UTC strings, which sort
//! lexicographically in time order.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqliteExecutor, SqlitePool};
use strongbox_auth::ActorId;
use tracing::{debug, info, instrument};

use crate::error::{AuditError, AuditResult};
use crate::event::{AuditAction, AuditEntry, NewAuditEntry};
use crate::query::{AuditFilter, AuditPage, PageRequest};

pub const DEFAULT_CLEANUP_BATCH_SIZE: u32 = 500;

#[derive(Debug, Clone)]
pub struct SqliteAuditLog {
	pool: SqlitePool,
}

impl SqliteAuditLog {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Append on its own connection. Fails loudly; callers must abort the
	/// action being audited when this returns an error.
	#[instrument(skip(self, entry), fields(action = %entry.action, actor = %entry.actor))]
	pub async fn append(&self, entry: NewAuditEntry) -> AuditResult<AuditEntry> {
		insert(&self.pool, entry, Utc::now()).await
	}

	/// Append inside the caller's transaction so the entry commits or rolls
	/// back together with the mutation it describes.
	#[instrument(skip(self, conn, entry), fields(action = %entry.action, actor = %entry.actor))]
	pub async fn append_in(
		&self,
		conn: &mut SqliteConnection,
		entry: NewAuditEntry,
	) -> AuditResult<AuditEntry> {
		insert(conn, entry, Utc::now()).await
	}

	/// Filtered query, newest first, paginated by id cursor.
	#[instrument(skip(self))]
	pub async fn query(&self, filter: &AuditFilter, page: PageRequest) -> AuditResult<AuditPage> {
		let limit = page.effective_limit();

		let mut conditions = vec!["1=1"];
		if page.cursor.is_some() {
			conditions.push("id < ?");
		}
		if filter.action.is_some() {
			conditions.push("action = ?");
		}
		if filter.actor.is_some() {
			conditions.push("actor = ?");
		}
		if filter.target_id.is_some() {
			conditions.push("target_id = ?");
		}
		if filter.from.is_some() {
			conditions.push("timestamp >= ?");
		}
		if filter.to.is_some() {
			conditions.push("timestamp <= ?");
		}

		let sql = format!(
			"SELECT id, timestamp, actor, action, target_id, detail \
			 FROM audit_entries WHERE {} ORDER BY id DESC LIMIT ?",
			conditions.join(" AND ")
		);

		let mut query = sqlx::query(&sql);
		if let Some(cursor) = page.cursor {
			query = query.bind(cursor);
		}
		if let Some(action) = filter.action {
			query = query.bind(action.as_str());
		}
		if let Some(actor) = &filter.actor {
			query = query.bind(actor.as_str());
		}
		if let Some(target_id) = &filter.target_id {
			query = query.bind(target_id.as_str());
		}
		if let Some(from) = filter.from {
			query = query.bind(format_timestamp(from));
		}
		if let Some(to) = filter.to {
			query = query.bind(format_timestamp(to));
		}
		// One extra row tells us whether another page exists.
		query = query.bind(i64::from(limit) + 1);

		let rows = query.fetch_all(&self.pool).await?;
		let mut entries = rows
			.iter()
			.map(entry_from_row)
			.collect::<AuditResult<Vec<_>>>()?;

		let next_cursor = if entries.len() > limit as usize {
			entries.truncate(limit as usize);
			entries.last().map(|e| e.id)
		} else {
			None
		};

		debug!(returned = entries.len(), ?next_cursor, "audit query");
		Ok(AuditPage {
			entries,
			next_cursor,
		})
	}

	/// Delete entries older than `retention_days`. Zero retains forever.
	pub async fn cleanup(&self, retention_days: u32, batch_size: u32) -> AuditResult<u64> {
		if retention_days == 0 {
			debug!("audit retention disabled, nothing to clean up");
			return Ok(0);
		}
		let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
		self.cleanup_before(cutoff, batch_size).await
	}

	/// Delete every entry with `timestamp < cutoff` in bounded batches,
	/// yielding between batches so interactive appends are not starved.
	/// Appends a `cleanup` entry when anything was removed.
	#[instrument(skip(self))]
	pub async fn cleanup_before(&self, cutoff: DateTime<Utc>, batch_size: u32) -> AuditResult<u64> {
		let batch_size = i64::from(batch_size.max(1));
		let cutoff_str = format_timestamp(cutoff);
		let mut removed: u64 = 0;

		loop {
			let result = sqlx::query(
				r#"
				DELETE FROM audit_entries
				WHERE id IN (
					SELECT id FROM audit_entries
					WHERE timestamp < ?
					ORDER BY id
					LIMIT ?
				)
				"#,
			)
			.bind(&cutoff_str)
			.bind(batch_size)
			.execute(&self.pool)
			.await?;

			let affected = result.rows_affected();
			removed += affected;
			if affected < batch_size as u64 {
				break;
			}
			tokio::task::yield_now().await;
		}

		if removed > 0 {
			self
				.append(
					NewAuditEntry::system(AuditAction::Cleanup)
						.detail("removed", removed)
						.detail("cutoff", cutoff_str.clone()),
				)
				.await?;
			info!(removed, cutoff = %cutoff_str, "audit retention sweep removed entries");
		}

		Ok(removed)
	}
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

async fn insert<'c, E>(
	executor: E,
	entry: NewAuditEntry,
	timestamp: DateTime<Utc>,
) -> AuditResult<AuditEntry>
where
	E: SqliteExecutor<'c>,
{
	let timestamp = timestamp.trunc_subsecs(6);
	let detail = Value::Object(entry.detail);
	let detail_json = serde_json::to_string(&detail)?;

	let result = sqlx::query(
		r#"
		INSERT INTO audit_entries (timestamp, actor, action, target_id, detail)
		VALUES (?, ?, ?, ?, ?)
		"#,
	)
	.bind(format_timestamp(timestamp))
	.bind(entry.actor.as_str())
	.bind(entry.action.as_str())
	.bind(entry.target_id.as_deref())
	.bind(&detail_json)
	.execute(executor)
	.await?;

	Ok(AuditEntry {
		id: result.last_insert_rowid(),
		timestamp,
		actor: entry.actor,
		action: entry.action,
		target_id: entry.target_id,
		detail,
	})
}

fn entry_from_row(row: &SqliteRow) -> AuditResult<AuditEntry> {
	let id: i64 = row.try_get("id")?;
	let corrupt = |reason: String| AuditError::Corrupt { id, reason };

	let ts: String = row.try_get("timestamp")?;
	let timestamp = DateTime::parse_from_rfc3339(&ts)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| corrupt(format!("bad timestamp: {e}")))?;

	let action: String = row.try_get("action")?;
	let action = action
		.parse::<AuditAction>()
		.map_err(|e| corrupt(e.to_string()))?;

	let detail: String = row.try_get("detail")?;
	let detail: Value =
		serde_json::from_str(&detail).map_err(|e| corrupt(format!("bad detail: {e}")))?;

	Ok(AuditEntry {
		id,
		timestamp,
		actor: ActorId::new(row.try_get::<String, _>("actor")?),
		action,
		target_id: row.try_get("target_id")?,
		detail,
	})
}
