// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strongbox_auth::ActorId;

use crate::event::{AuditAction, AuditEntry};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 200;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditFilter {
	pub action: Option<AuditAction>,
	pub actor: Option<ActorId>,
	pub target_id: Option<String>,
	/// Inclusive lower bound.
	pub from: Option<DateTime<Utc>>,
	/// Inclusive upper bound.
	pub to: Option<DateTime<Utc>>,
}

/// Cursor page request. `cursor` is the `next_cursor` of the previous page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
	pub cursor: Option<i64>,
	pub limit: Option<u32>,
}

impl PageRequest {
	pub fn first(limit: u32) -> Self {
		Self {
			cursor: None,
			limit: Some(limit),
		}
	}

	pub fn after(cursor: i64, limit: u32) -> Self {
		Self {
			cursor: Some(cursor),
			limit: Some(limit),
		}
	}

	pub fn effective_limit(&self) -> u32 {
		self
			.limit
			.unwrap_or(DEFAULT_PAGE_SIZE)
			.clamp(1, MAX_PAGE_SIZE)
	}
}

/// Entries newest first. `next_cursor` is `None` on the last page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPage {
	pub entries: Vec<AuditEntry>,
	pub next_cursor: Option<i64>,
}
