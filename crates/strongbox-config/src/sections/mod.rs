// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections. Each section has a partial `*ConfigLayer` used
//! for merging sources and a resolved runtime type.

mod database;
mod directory;
mod encryption;
mod http;
mod jobs;
mod logging;
mod session;
mod settings;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use directory::{DirectoryConfig, DirectoryConfigLayer, DirectoryUserConfig};
pub use encryption::{EncryptionConfig, EncryptionConfigLayer, DEFAULT_KEY_ENV};
pub use http::{HttpConfig, HttpConfigLayer};
pub use jobs::{JobsConfig, JobsConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use session::{SessionConfig, SessionConfigLayer, StepUpConfig, StepUpConfigLayer};
pub use settings::SettingsConfigLayer;
