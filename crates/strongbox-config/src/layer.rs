// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{
	DatabaseConfigLayer, DirectoryConfigLayer, EncryptionConfigLayer, HttpConfigLayer,
	JobsConfigLayer, LoggingConfigLayer, SessionConfigLayer, SettingsConfigLayer,
	StepUpConfigLayer,
};

/// Partial server configuration from a single source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub encryption: Option<EncryptionConfigLayer>,
	#[serde(default)]
	pub settings: Option<SettingsConfigLayer>,
	#[serde(default)]
	pub step_up: Option<StepUpConfigLayer>,
	#[serde(default)]
	pub session: Option<SessionConfigLayer>,
	#[serde(default)]
	pub jobs: Option<JobsConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub directory: Option<DirectoryConfigLayer>,
}

macro_rules! merge_section {
	($self:ident, $other:ident, $($field:ident),+ $(,)?) => {
		$(
			if let Some(layer) = $other.$field {
				match &mut $self.$field {
					Some(existing) => existing.merge(layer),
					None => $self.$field = Some(layer),
				}
			}
		)+
	};
}

impl ServerConfigLayer {
	/// Overlay `other` on top of `self`; set fields in `other` win.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_section!(
			self, other, http, database, encryption, settings, step_up, session, jobs, logging,
			directory,
		);
	}
}
