// ABOUTME: Store factory for environment-based backend selection
// ABOUTME: Builds the shared key/value store handle injected into the assistant registry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{memory::InMemoryStore, redis::RedisStore, KeyValueStore};
use crate::config::environment::{StoreBackend, StoreConfig};
use crate::errors::AppResult;
use std::sync::Arc;

/// Create the configured store backend
///
/// # Errors
///
/// Returns an error if the Redis backend is selected and cannot be reached
pub async fn create_store(config: &StoreConfig) -> AppResult<Arc<dyn KeyValueStore>> {
    match config.backend {
        StoreBackend::Redis => {
            let store = RedisStore::connect(config).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; state is lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}
