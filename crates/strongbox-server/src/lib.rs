// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP surface for the Strongbox credential store.
//!
//! Handlers are thin: they resolve the caller from the bearer token, call
//! into [`CredentialService`] and map [`CredentialError`] onto status codes.
//!
//! [`CredentialService`]: strongbox_credentials::CredentialService
//! [`CredentialError`]: strongbox_credentials::CredentialError

pub mod api;
pub mod auth;
pub mod error;
pub mod health;
pub mod jobs;
pub mod routes;

pub use api::{create_app_state, create_router, AppState};
pub use error::{ApiError, ApiResult, ErrorResponse};
