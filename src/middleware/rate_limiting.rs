// ABOUTME: Per-IP fixed-window request rate limiting for the HTTP API
// ABOUTME: Tracks request counts in a sharded map and rejects excess requests with 429
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use tracing::warn;

use super::RequestId;
use crate::config::environment::RateLimitConfig;
use crate::constants::rate_limit::{CLEANUP_THRESHOLD, LIMIT_HEADER, REMAINING_HEADER};
use crate::errors::AppError;

/// Outcome of one rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// Whether the request must be rejected
    pub is_limited: bool,
    /// Requests allowed per window
    pub limit: u32,
    /// Requests left in the current window, after this one
    pub remaining: u32,
    /// Seconds until the current window resets
    pub reset_after_secs: u64,
}

/// Fixed-window rate limiter keyed by client IP
#[derive(Clone)]
pub struct IpRateLimiter {
    /// Per-IP request tracking: IP -> (`request_count`, `window_start`)
    state: Arc<DashMap<IpAddr, (u32, Instant)>>,
    config: RateLimitConfig,
}

impl IpRateLimiter {
    /// Create a limiter with empty state
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            state: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Limiter configuration
    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count one request from `client_ip` and report whether it is allowed
    #[must_use]
    pub fn check(&self, client_ip: IpAddr) -> RateLimitStatus {
        self.check_at(client_ip, Instant::now())
    }

    fn check_at(&self, client_ip: IpAddr, now: Instant) -> RateLimitStatus {
        let limit = self.config.max_requests;
        let window = self.config.window();

        let mut entry = self.state.entry(client_ip).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.duration_since(*window_start) >= window {
            *count = 0;
            *window_start = now;
        }

        let is_limited = *count >= limit;
        if !is_limited {
            *count += 1;
        }
        let remaining = limit.saturating_sub(*count);
        let elapsed = now.duration_since(*window_start);
        drop(entry);

        if self.state.len() > CLEANUP_THRESHOLD {
            self.cleanup_expired(now);
        }

        RateLimitStatus {
            is_limited,
            limit,
            remaining,
            reset_after_secs: window.saturating_sub(elapsed).as_secs().max(1),
        }
    }

    /// Number of IPs currently tracked
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.state.len()
    }

    fn cleanup_expired(&self, now: Instant) {
        let window = self.config.window();
        self.state
            .retain(|_ip, (_count, start)| now.duration_since(*start) < window);
    }
}

/// Client address from the connection, or the unspecified address when unknown
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ConnectInfo(addr)| addr.ip())
}

/// Reject requests over the per-IP allowance with `429 Too Many Requests`
pub async fn rate_limit_middleware(
    State(limiter): State<IpRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    let status = limiter.check(ip);

    if status.is_limited {
        warn!(client_ip = %ip, limit = status.limit, "Rate limit exceeded");
        let mut error = AppError::rate_limited(status.limit, status.reset_after_secs);
        if let Some(request_id) = request.extensions().get::<RequestId>() {
            error = error.with_request_id(request_id.as_str());
        }
        let mut response = error.into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(status.reset_after_secs));
        insert_limit_headers(&mut response, &status);
        return response;
    }

    let mut response = next.run(request).await;
    insert_limit_headers(&mut response, &status);
    response
}

fn insert_limit_headers(response: &mut Response, status: &RateLimitStatus) {
    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(status.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(status.remaining));
}
