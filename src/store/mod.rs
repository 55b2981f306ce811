// ABOUTME: Key/value store abstraction for assistant records and client thread mappings
// ABOUTME: Pluggable backend support (Redis, in-memory) selected by the store factory
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Key/Value Store
//!
//! The assistant core persists two kinds of data:
//!
//! - plain string keys holding JSON blobs (assistant records keyed by name)
//! - hash keys whose fields map assistant types to thread ids
//!
//! Every operation distinguishes "absent" from "unavailable": `Ok(None)` means
//! the key or field does not exist, `Err(_)` means the store could not answer.

/// Store factory for environment-based backend selection
pub mod factory;
/// In-memory store implementation
pub mod memory;
/// Redis store implementation
pub mod redis;

use crate::errors::AppResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Key/value store contract consumed by the assistant core
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a string key
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Write a string key, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Read one field of a hash key
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable
    async fn hget(&self, key: &str, field: &str) -> AppResult<Option<String>>;

    /// Write one field of a hash key; returns the number of newly created fields
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable
    async fn hset(&self, key: &str, field: &str, value: &str) -> AppResult<u64>;

    /// Write one field only if it does not exist yet; returns whether it was written
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable
    async fn hset_if_absent(&self, key: &str, field: &str, value: &str) -> AppResult<bool>;

    /// Verify the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the backend does not respond
    async fn health_check(&self) -> AppResult<()>;

    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}

/// Read and decode a JSON value stored under a plain key
///
/// A value that is present but not decodable as `T` is logged and reported as absent.
///
/// # Errors
///
/// Returns an error if the store is unavailable
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> AppResult<Option<T>> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key = %key, "Ignoring undecodable stored value: {}", e);
            Ok(None)
        }
    }
}

/// Encode a value as JSON and store it under a plain key
///
/// # Errors
///
/// Returns an error if serialization fails or the store is unavailable
pub async fn set_json<T: Serialize + Sync>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> AppResult<()> {
    let encoded = serde_json::to_string(value)?;
    store.set(key, &encoded).await
}
