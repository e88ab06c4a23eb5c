// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authenticated encryption for credential payloads.
//!
//! The [`EncryptionService`] wraps AES-256-GCM with a single process-wide key.
//! When no usable key is configured the service reports itself unavailable
//! and every operation fails closed with [`CryptoError::Unavailable`].

pub mod cipher;
pub mod error;
pub mod key;
pub mod service;

pub use cipher::{Ciphertext, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{load_key, EncryptionKey, KeyId, DEFAULT_KEY_ID};
pub use service::EncryptionService;
