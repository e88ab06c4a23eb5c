// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{
	extract::{Query, State},
	Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use strongbox_audit::{AuditAction, AuditActionInfo, AuditFilter, AuditPage, PageRequest};
use strongbox_auth::ActorId;

use crate::api::AppState;
use crate::auth::RequireActor;
use crate::error::ApiResult;

/// `GET /api/audit` query string. Kept flat because the urlencoded
/// deserializer cannot type numbers inside flattened structs.
#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
	pub action: Option<AuditAction>,
	pub actor: Option<String>,
	pub target_id: Option<String>,
	pub from: Option<DateTime<Utc>>,
	pub to: Option<DateTime<Utc>>,
	pub cursor: Option<i64>,
	pub limit: Option<u32>,
}

impl AuditQuery {
	fn into_parts(self) -> (AuditFilter, PageRequest) {
		let filter = AuditFilter {
			action: self.action,
			actor: self.actor.map(ActorId::new),
			target_id: self.target_id,
			from: self.from,
			to: self.to,
		};
		let page = PageRequest {
			cursor: self.cursor,
			limit: self.limit,
		};
		(filter, page)
	}
}

pub async fn query_audit_log(
	State(state): State<AppState>,
	RequireActor(ctx): RequireActor,
	Query(query): Query<AuditQuery>,
) -> ApiResult<Json<AuditPage>> {
	let (filter, page) = query.into_parts();
	Ok(Json(state.credentials.query_audit_log(&ctx, &filter, page).await?))
}

/// Action catalogue for filter menus; any signed-in caller may read it.
pub async fn list_audit_actions(RequireActor(_ctx): RequireActor) -> Json<Vec<AuditActionInfo>> {
	Json(AuditActionInfo::all())
}
