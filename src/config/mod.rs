// ABOUTME: Configuration management module for centralized server settings
// ABOUTME: Re-exports environment-driven configuration for server, store, remote API and polling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module
//!
//! All configuration comes from environment variables (optionally seeded from
//! a `.env` file). See [`environment::ServerConfig::from_env`].

/// Environment and server configuration
pub mod environment;

pub use environment::{
    Environment, HttpConfig, RateLimitConfig, RedisConnectionConfig, RemoteApiConfig,
    RunPollConfig, ServerConfig, StoreBackend, StoreConfig,
};
