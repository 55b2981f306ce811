// ABOUTME: Main library entry point for the assistant hub service
// ABOUTME: Provisions per-client remote LLM assistants and threads backed by a key/value store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Assistant Hub
//!
//! An HTTP service that provisions, per client and assistant type, a remote
//! assistant (`OpenAI` Assistants v2 wire format) and a conversation thread,
//! persisting identities in Redis.
//!
//! ## Architecture
//!
//! - **Store**: key/value contract with Redis and in-memory backends
//! - **LLM**: remote assistants API contract and its HTTP client
//! - **Assistant**: session state machine, run polling and the registry that
//!   reconciles requested configuration with persisted state
//! - **Routes / Server**: axum endpoints and middleware stack
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use assistant_hub::config::environment::ServerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Assistant Hub configured on port {}", config.http.port);
//!     Ok(())
//! }
//! ```

/// Assistant lifecycle core: registry and sessions
pub mod assistant;

/// Environment-driven configuration
pub mod config;

/// Application constants
pub mod constants;

/// Unified error handling
pub mod errors;

/// Remote assistants API contract and client
pub mod llm;

/// Structured logging setup
pub mod logging;

/// HTTP middleware
pub mod middleware;

/// HTTP route groups
pub mod routes;

/// Server assembly and serve loop
pub mod server;

/// Key/value store contract and backends
pub mod store;
