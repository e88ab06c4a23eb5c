// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod access;
pub mod audit;
pub mod credentials;
pub mod health;
pub mod jobs;
pub mod session;
pub mod settings;
