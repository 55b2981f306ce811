// ABOUTME: Assistant provisioning and messaging route handlers
// ABOUTME: Validates request bodies and delegates to the assistant registry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Assistant routes
//!
//! - `POST /assistants/:client_id/:assistant_type` provisions (or updates) the
//!   assistant for a client and returns its thread id as `assistantId`
//! - `POST /assistants/:client_id/:assistant_type/messages` sends a message on
//!   the pair's thread and returns the assistant reply

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    assistant::{AssistantParams, MessageReply},
    errors::{AppError, AppResult},
    middleware::RequestId,
    server::ServerResources,
};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response to a provisioning request
#[derive(Debug, Serialize, Deserialize)]
pub struct ProvisionResponse {
    /// Thread id of the (client, assistant type) pair
    #[serde(rename = "assistantId")]
    pub assistant_id: String,
}

/// Request to send a message to an assistant
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Message text
    #[serde(default)]
    pub message: String,
    /// Assistant configuration, used if the assistant must be created
    #[serde(flatten)]
    pub params: AssistantParams,
}

// ============================================================================
// Assistant Routes
// ============================================================================

/// Assistant routes handler
pub struct AssistantRoutes;

impl AssistantRoutes {
    /// Create all assistant routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/assistants/:client_id/:assistant_type",
                post(Self::provision_assistant),
            )
            .route(
                "/assistants/:client_id/:assistant_type/messages",
                post(Self::send_message),
            )
            .with_state(resources)
    }

    /// Provision or update the assistant of a client
    async fn provision_assistant(
        State(resources): State<Arc<ServerResources>>,
        Path((client_id, assistant_type)): Path<(String, String)>,
        request_id: Option<Extension<RequestId>>,
        body: Result<Json<AssistantParams>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let result = Self::provision(&resources, &client_id, &assistant_type, body).await;
        Self::respond(result, request_id.as_ref().map(|Extension(id)| id))
    }

    /// Send a message on the pair's thread
    async fn send_message(
        State(resources): State<Arc<ServerResources>>,
        Path((client_id, assistant_type)): Path<(String, String)>,
        request_id: Option<Extension<RequestId>>,
        body: Result<Json<SendMessageRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let result = Self::message(&resources, &client_id, &assistant_type, body).await;
        Self::respond(result, request_id.as_ref().map(|Extension(id)| id))
    }

    async fn provision(
        resources: &ServerResources,
        client_id: &str,
        assistant_type: &str,
        body: Result<Json<AssistantParams>, JsonRejection>,
    ) -> AppResult<ProvisionResponse> {
        let Json(params) = body.map_err(Self::invalid_body)?;
        params.validate()?;

        let thread_id = resources
            .registry
            .create_or_update_assistant(client_id, assistant_type, &params)
            .await?;

        info!(
            client_id = %client_id,
            assistant_type = %assistant_type,
            thread_id = %thread_id,
            "Assistant provisioned"
        );

        Ok(ProvisionResponse {
            assistant_id: thread_id,
        })
    }

    async fn message(
        resources: &ServerResources,
        client_id: &str,
        assistant_type: &str,
        body: Result<Json<SendMessageRequest>, JsonRejection>,
    ) -> AppResult<MessageReply> {
        let Json(request) = body.map_err(Self::invalid_body)?;
        if request.message.trim().is_empty() {
            return Err(AppError::missing_field("message"));
        }
        request.params.validate_assistant_fields()?;

        resources
            .registry
            .send_message(client_id, assistant_type, &request.params, &request.message)
            .await
    }

    fn invalid_body(rejection: JsonRejection) -> AppError {
        AppError::invalid_input(format!("Invalid request body: {}", rejection.body_text()))
    }

    fn respond<T: Serialize>(
        result: AppResult<T>,
        request_id: Option<&RequestId>,
    ) -> Result<Response, AppError> {
        match result {
            Ok(body) => Ok((StatusCode::OK, Json(body)).into_response()),
            Err(error) => Err(match request_id {
                Some(id) => error.with_request_id(id.as_str()),
                None => error,
            }),
        }
    }
}
