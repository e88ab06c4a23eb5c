// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for Strongbox: pool setup, migrations, the credential
//! repository, the settings store and stored capability grants.

pub mod credential;
pub mod error;
pub mod grants;
pub mod pool;
pub mod settings;
pub mod testing;

pub use credential::{CredentialRecord, CredentialRepository};
pub use error::{DbError, Result};
pub use grants::SqliteGrantStore;
pub use pool::{create_pool, run_migrations};
pub use settings::SqliteSettingsStore;
