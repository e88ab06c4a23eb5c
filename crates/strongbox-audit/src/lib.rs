// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Append-only audit ledger for credential access.
//!
//! Every security-relevant action (reveal, create, update, delete, step-up
//! verification, settings and access changes) is recorded as one
//! [`AuditEntry`]. Entries are write-once; the only deletion path is the
//! retention sweep in [`SqliteAuditLog::cleanup`], which removes whole
//! entries older than the cutoff.
//!
//! # Example
//!
//! ```ignore
//! use strongbox_audit::{AuditAction, NewAuditEntry, SqliteAuditLog};
//!
//! let log = SqliteAuditLog::new(pool);
//! log.append(
//!     NewAuditEntry::new(AuditAction::View, actor.clone())
//!         .target(credential_id.to_string())
//!         .success(),
//! )
//! .await?;
//! ```

pub mod error;
pub mod event;
pub mod log;
pub mod query;

pub use error::{AuditError, AuditResult};
pub use event::{AuditAction, AuditActionInfo, AuditEntry, AuditOutcome, NewAuditEntry, SYSTEM_ACTOR};
pub use log::{SqliteAuditLog, DEFAULT_CLEANUP_BATCH_SIZE};
pub use query::{AuditFilter, AuditPage, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
