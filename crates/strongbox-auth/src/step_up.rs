// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Step-up verification state.
//!
//! Per `(actor, session)`:
//!
//! ```text
//! Unverified ──(correct password)──▶ Verified(expires_at)
//!     ▲                                    │
//!     └──────────(expiry | logout)─────────┘
//! ```
//!
//! State lives in memory only, so a restart returns everyone to
//! `Unverified`. Expiry is checked lazily when the state is read, and
//! abandoned entries are swept by [`StepUpRegistry::prune_expired`].

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::types::{ActorContext, ActorId, SessionId};

/// Proof that `actor` re-entered their password on `session_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepUpSession {
	pub actor: ActorId,
	pub session_id: SessionId,
	pub verified_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

impl StepUpSession {
	pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
		now < self.expires_at
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StepUpState {
	Unverified,
	Verified { expires_at: DateTime<Utc> },
}

type SessionKey = (ActorId, SessionId);

#[derive(Debug, Default)]
pub struct StepUpRegistry {
	sessions: DashMap<SessionKey, StepUpSession>,
	max_lifetime: Option<Duration>,
}

impl StepUpRegistry {
	/// Verification lasts for the rest of the interactive session.
	pub fn new() -> Self {
		Self::default()
	}

	/// Verification lasts for the rest of the interactive session, but never
	/// longer than `max_lifetime`.
	pub fn with_max_lifetime(max_lifetime: Duration) -> Self {
		Self {
			sessions: DashMap::new(),
			max_lifetime: Some(max_lifetime),
		}
	}

	pub fn record_verified(&self, ctx: &ActorContext) -> StepUpSession {
		self.record_verified_at(ctx, Utc::now())
	}

	pub fn record_verified_at(&self, ctx: &ActorContext, now: DateTime<Utc>) -> StepUpSession {
		let mut expires_at = ctx.session_expires_at;
		if let Some(max) = self.max_lifetime {
			expires_at = expires_at.min(now + max);
		}

		let session = StepUpSession {
			actor: ctx.identity.id.clone(),
			session_id: ctx.session_id,
			verified_at: now,
			expires_at,
		};
		self
			.sessions
			.insert(key(ctx), session.clone());
		debug!(actor = %ctx.identity.id, session_id = %ctx.session_id, %expires_at, "step-up verified");
		session
	}

	pub fn state(&self, ctx: &ActorContext) -> StepUpState {
		self.state_at(ctx, Utc::now())
	}

	pub fn state_at(&self, ctx: &ActorContext, now: DateTime<Utc>) -> StepUpState {
		let key = key(ctx);
		let expired = match self.sessions.get(&key) {
			None => return StepUpState::Unverified,
			Some(session) if session.is_valid_at(now) => {
				return StepUpState::Verified {
					expires_at: session.expires_at,
				}
			}
			Some(_) => true,
		};

		if expired {
			self
				.sessions
				.remove_if(&key, |_, session| !session.is_valid_at(now));
			debug!(actor = %ctx.identity.id, session_id = %ctx.session_id, "step-up expired");
		}
		StepUpState::Unverified
	}

	pub fn is_verified(&self, ctx: &ActorContext) -> bool {
		self.is_verified_at(ctx, Utc::now())
	}

	pub fn is_verified_at(&self, ctx: &ActorContext, now: DateTime<Utc>) -> bool {
		matches!(self.state_at(ctx, now), StepUpState::Verified { .. })
	}

	/// Drop verification for one session (logout).
	pub fn invalidate(&self, actor: &ActorId, session_id: SessionId) {
		if self
			.sessions
			.remove(&(actor.clone(), session_id))
			.is_some()
		{
			debug!(%actor, %session_id, "step-up invalidated");
		}
	}

	/// Drop every verification that has expired by `now`. Returns how many
	/// were removed.
	pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
		let before = self.sessions.len();
		self.sessions.retain(|_, session| session.is_valid_at(now));
		before.saturating_sub(self.sessions.len())
	}

	pub fn len(&self) -> usize {
		self.sessions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sessions.is_empty()
	}
}

fn key(ctx: &ActorContext) -> SessionKey {
	(ctx.identity.id.clone(), ctx.session_id)
}
