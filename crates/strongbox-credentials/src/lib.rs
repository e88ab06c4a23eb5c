// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential store for Strongbox.
//!
//! Requests flow through three layers:
//!
//! 1. [`AccessGate`]: capability check and, for reveals, step-up verification
//! 2. [`CredentialService`]: validation, encryption and persistence
//! 3. The audit log, which records the outcome whether or not it succeeded
//!
//! Secret payloads are encrypted with the credential id bound as associated
//! data, and plaintext only ever leaves through
//! [`CredentialService::reveal_credential`].

pub mod error;
pub mod gate;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod testing;

pub use error::{CredentialError, CredentialResult};
pub use gate::AccessGate;
pub use service::{CredentialService, EffectiveSettings};
pub use types::{
	CreateCredentialInput, CredentialKind, CredentialPayload, CredentialSummary, CredentialTypeInfo,
	ExposedPayload, PayloadFields, RevealedCredential, UpdateCredentialInput,
};
