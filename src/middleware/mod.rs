// ABOUTME: HTTP middleware for request correlation and response hardening
// ABOUTME: Provides request IDs with span propagation, per-IP rate limiting and security headers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Per-IP request rate limiting
pub mod rate_limiting;
/// Request ID generation and propagation
pub mod request_id;
/// Security response headers
pub mod security;

pub use rate_limiting::{rate_limit_middleware, IpRateLimiter, RateLimitStatus};
pub use request_id::{request_id_middleware, RequestId};
pub use security::SecurityHeaders;
