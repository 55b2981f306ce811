// ABOUTME: Redis key/value store with connection manager, startup retry and atomic hash writes
// ABOUTME: Persists assistant records and per-client thread mappings shared across instances
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::KeyValueStore;
use crate::config::environment::{RedisConnectionConfig, StoreConfig};
use crate::errors::{AppError, AppResult};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, ProtocolVersion, RedisConnectionInfo};
use std::time::Duration;
use tracing::{error, info, warn};

/// Redis store
///
/// Uses Redis `ConnectionManager` for automatic reconnection. Keys are used
/// verbatim so data written by other services sharing the instance stays readable.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis using the store configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or every connection attempt fails
    pub async fn connect(config: &StoreConfig) -> AppResult<Self> {
        let client = match &config.redis_url {
            Some(url) => redis::Client::open(url.as_str()),
            None => redis::Client::open(Self::connection_info(config)),
        }
        .map_err(|e| AppError::config(format!("Failed to create Redis client: {e}")))?;

        let conn_config = &config.connection;

        info!(
            "Connecting to Redis at {} (timeout={}s, response_timeout={}s, retries={})",
            config.describe_target(),
            conn_config.connection_timeout_secs,
            conn_config.response_timeout_secs,
            conn_config.initial_connection_retries
        );

        let manager = Self::connect_with_retry(&client, conn_config).await?;

        info!("Successfully connected to Redis");

        Ok(Self { manager })
    }

    /// Build connection info from host/port/password
    fn connection_info(config: &StoreConfig) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.redis_host.clone(), config.redis_port),
            redis: RedisConnectionInfo {
                db: 0,
                username: None,
                password: config.redis_password.clone(),
                protocol: ProtocolVersion::RESP2,
            },
        }
    }

    /// Connect to Redis with exponential backoff retry on failure
    async fn connect_with_retry(
        client: &redis::Client,
        conn_config: &RedisConnectionConfig,
    ) -> AppResult<ConnectionManager> {
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_secs(conn_config.connection_timeout_secs))
            .set_response_timeout(Duration::from_secs(conn_config.response_timeout_secs))
            .set_number_of_retries(conn_config.reconnection_retries)
            .set_exponent_base(conn_config.retry_exponent_base)
            .set_max_delay(conn_config.max_retry_delay_ms);

        let max_retries = conn_config.initial_connection_retries;
        let max_delay_ms = conn_config.max_retry_delay_ms;

        let mut last_error = None;
        let mut delay_ms = conn_config.initial_retry_delay_ms;

        for attempt in 0..=max_retries {
            match ConnectionManager::new_with_config(client.clone(), manager_config.clone()).await {
                Ok(manager) => {
                    if attempt > 0 {
                        info!("Redis connection established after {} retries", attempt);
                    }
                    return Ok(manager);
                }
                Err(e) => {
                    if attempt < max_retries {
                        warn!(
                            "Redis connection attempt {}/{} failed, retrying in {}ms: {}",
                            attempt + 1,
                            max_retries + 1,
                            delay_ms,
                            e
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(max_delay_ms);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(AppError::storage(format!(
            "Failed to connect to Redis after {} attempts: {}",
            max_retries + 1,
            last_error.map_or_else(|| "unknown error".to_owned(), |e| e.to_string())
        )))
    }

    fn command_error(operation: &str, e: &redis::RedisError) -> AppError {
        error!("Redis {} operation failed: {}", operation, e);
        AppError::storage(format!("Redis {operation} failed: {e}"))
    }
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.manager.clone();
        conn.get(key)
            .await
            .map_err(|e| Self::command_error("GET", &e))
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut conn = self.manager.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| Self::command_error("SET", &e))
    }

    async fn hget(&self, key: &str, field: &str) -> AppResult<Option<String>> {
        let mut conn = self.manager.clone();
        conn.hget(key, field)
            .await
            .map_err(|e| Self::command_error("HGET", &e))
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> AppResult<u64> {
        let mut conn = self.manager.clone();
        conn.hset(key, field, value)
            .await
            .map_err(|e| Self::command_error("HSET", &e))
    }

    async fn hset_if_absent(&self, key: &str, field: &str, value: &str) -> AppResult<bool> {
        let mut conn = self.manager.clone();
        conn.hset_nx(key, field, value)
            .await
            .map_err(|e| Self::command_error("HSETNX", &e))
    }

    async fn health_check(&self) -> AppResult<()> {
        let mut conn = self.manager.clone();

        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::command_error("PING", &e))?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(AppError::storage(format!(
                "Unexpected PING response '{response}'"
            )))
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
