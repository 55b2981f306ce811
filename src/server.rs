// ABOUTME: HTTP server assembly: shared resources, router, middleware stack and serve loop
// ABOUTME: Wires the assistant registry into axum routes and shuts down gracefully on signals
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # HTTP Server
//!
//! [`ServerResources`] holds everything handlers need and is built once at
//! startup from injected collaborators (store and remote provider).
//! [`build_router`] merges the route groups and applies the middleware stack:
//! tracing, request ids, per-IP rate limiting, timeout, body limit and
//! security headers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::{
    assistant::AssistantRegistry,
    config::environment::ServerConfig,
    llm::AssistantProvider,
    middleware::{rate_limit_middleware, request_id_middleware, IpRateLimiter, SecurityHeaders},
    routes::{AssistantRoutes, HealthRoutes},
    store::KeyValueStore,
};

/// Shared state handed to every route group
pub struct ServerResources {
    /// Assistant registry
    pub registry: Arc<AssistantRegistry>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Per-IP request counters, shared by every router built from these resources
    pub rate_limiter: IpRateLimiter,
}

impl ServerResources {
    /// Build resources around the given store and remote provider
    #[must_use]
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn AssistantProvider>,
    ) -> Self {
        let registry = AssistantRegistry::new(store, provider, config.run_poll);
        Self {
            registry: Arc::new(registry),
            rate_limiter: IpRateLimiter::new(config.rate_limit),
            config: Arc::new(config),
        }
    }
}

/// Build the application router with its middleware stack
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let http = &resources.config.http;
    let timeout = Duration::from_secs(http.request_timeout_secs);
    let body_limit = http.max_body_bytes;
    let security = SecurityHeaders::for_environment(&resources.config.environment);

    let mut router = Router::new()
        .merge(HealthRoutes::routes(Arc::clone(&resources)))
        .merge(AssistantRoutes::routes(Arc::clone(&resources)));

    if resources.config.rate_limit.enabled {
        router = router.layer(middleware::from_fn_with_state(
            resources.rate_limiter.clone(),
            rate_limit_middleware,
        ));
    }

    security
        .apply(router)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Bind the configured address and serve until a shutdown signal arrives
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails
pub async fn serve(resources: Arc<ServerResources>) -> Result<()> {
    let address = format!(
        "{}:{}",
        resources.config.http.host, resources.config.http.port
    );
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {address}"))?;

    info!("HTTP server listening on {}", listener.local_addr()?);

    let app = build_router(resources).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated with an error")?;

    info!("HTTP server stopped");
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
