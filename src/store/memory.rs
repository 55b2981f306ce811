// ABOUTME: In-memory key/value store with the same string and hash semantics as Redis
// ABOUTME: Used for local development runs and as the default store in tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::KeyValueStore;
use crate::errors::AppResult;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local store
///
/// String keys and hash keys live in separate maps. Hash writes hold the write
/// lock for the whole check-and-insert, so `hset_if_absent` is atomic.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    strings: Arc<RwLock<HashMap<String, String>>>,
    hashes: Arc<RwLock<HashMap<String, HashMap<String, String>>>>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields stored under a hash key
    pub async fn hash_len(&self, key: &str) -> usize {
        self.hashes.read().await.get(key).map_or(0, HashMap::len)
    }
}

#[async_trait::async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.strings.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.strings
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> AppResult<Option<String>> {
        Ok(self
            .hashes
            .read()
            .await
            .get(key)
            .and_then(|fields| fields.get(field))
            .cloned())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> AppResult<u64> {
        let mut hashes = self.hashes.write().await;
        let previous = hashes
            .entry(key.to_owned())
            .or_default()
            .insert(field.to_owned(), value.to_owned());
        drop(hashes);
        Ok(u64::from(previous.is_none()))
    }

    async fn hset_if_absent(&self, key: &str, field: &str, value: &str) -> AppResult<bool> {
        let mut hashes = self.hashes.write().await;
        let fields = hashes.entry(key.to_owned()).or_default();
        if fields.contains_key(field) {
            return Ok(false);
        }
        fields.insert(field.to_owned(), value.to_owned());
        drop(hashes);
        Ok(true)
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
