// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity and authorization primitives for Strongbox.
//!
//! The host platform owns users and roles; this crate only consumes them
//! through two seams:
//!
//! - [`AuthorizationPolicy`]: "does this actor hold a capability?"
//! - [`IdentityProvider`]: "who is calling?" and "is this their password?"
//!
//! On top of those seams it keeps the per-session [`StepUpRegistry`], the
//! short-lived proof that an actor recently re-entered their own password.
//!
//! [`LocalDirectory`] is a small in-process implementation of all seams for
//! standalone deployments and tests. Its capability grants can be made
//! durable through a [`GrantStore`].

pub mod directory;
pub mod error;
pub mod password;
pub mod policy;
pub mod step_up;
pub mod types;

pub use directory::{DirectoryUser, LocalDirectory, LoginSession};
pub use error::{AuthError, AuthResult};
pub use password::{hash_password, verify_password};
pub use policy::{AccessDirectory, AccessEntry, AuthorizationPolicy, GrantStore, IdentityProvider};
pub use step_up::{StepUpRegistry, StepUpSession, StepUpState};
pub use types::{ActorContext, ActorId, Capability, Identity, SessionId};
