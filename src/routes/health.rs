// ABOUTME: Health check route handlers for service monitoring and status endpoints
// ABOUTME: Provides liveness and store-backed readiness endpoints for load balancers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Health check routes for service monitoring
//!
//! `/health` reports liveness only. `/ready` additionally pings the key/value
//! store and answers 503 while it is unreachable.

use std::sync::Arc;

use crate::constants::service_names;
use crate::server::ServerResources;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<ServerResources>) -> axum::Router {
        use axum::{extract::State, http::StatusCode, routing::get, Json, Router};

        async fn health_handler() -> Json<serde_json::Value> {
            Json(serde_json::json!({
                "status": "healthy",
                "service": service_names::ASSISTANT_HUB,
                "version": env!("CARGO_PKG_VERSION"),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }))
        }

        async fn ready_handler(
            State(resources): State<Arc<ServerResources>>,
        ) -> (StatusCode, Json<serde_json::Value>) {
            let store = resources.registry.store();
            match store.health_check().await {
                Ok(()) => (
                    StatusCode::OK,
                    Json(serde_json::json!({
                        "status": "ready",
                        "store": store.backend_name(),
                        "timestamp": chrono::Utc::now().to_rfc3339()
                    })),
                ),
                Err(e) => {
                    tracing::warn!("Readiness check failed: {}", e);
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(serde_json::json!({
                            "status": "not_ready",
                            "store": store.backend_name(),
                            "timestamp": chrono::Utc::now().to_rfc3339()
                        })),
                    )
                }
            }
        }

        Router::new()
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .with_state(resources)
    }
}
