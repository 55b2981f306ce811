// ABOUTME: OpenAI Assistants v2 HTTP client implementing the assistant provider contract
// ABOUTME: Handles auth and beta headers, error mapping, run payloads and message pagination
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # `OpenAI` Assistants Provider
//!
//! Talks to any endpoint implementing the `OpenAI` Assistants v2 API.
//!
//! ## Configuration
//!
//! - `OPENAI_API_KEY`: bearer token (an empty key sends no `Authorization` header)
//! - `OPENAI_BASE_URL`: API root, default `https://api.openai.com/v1`
//! - `OPENAI_ORGANIZATION`: optional organization header

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

use super::{
    AssistantObject, AssistantProvider, CreateAssistantRequest, MessageRole,
    ModifyAssistantRequest, RunObject, ThreadMessage, ThreadObject,
};
use crate::config::environment::RemoteApiConfig;
use crate::constants::remote_api::{BETA_HEADER_NAME, BETA_HEADER_VALUE, MESSAGE_LIST_LIMIT};
use crate::errors::{AppError, AppResult, ErrorCode};

const SERVICE_NAME: &str = "OpenAI Assistants";

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateMessageBody<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateRunBody<'a> {
    assistant_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// `OpenAI` Assistants v2 provider
pub struct OpenAiAssistantsProvider {
    client: Client,
    config: RemoteApiConfig,
}

impl OpenAiAssistantsProvider {
    /// Create a new provider with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: RemoteApiConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Build the API URL for a given endpoint
    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Add authorization, organization and beta headers
    fn add_headers(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(BETA_HEADER_NAME, BETA_HEADER_VALUE);
        let request = if self.config.api_key.is_empty() {
            request
        } else {
            request.bearer_auth(&self.config.api_key)
        };
        match &self.config.organization {
            Some(org) => request.header("OpenAI-Organization", org),
            None => request,
        }
    }

    /// Parse error response from API
    fn parse_error_response(status: StatusCode, body: &str) -> AppError {
        if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(body) {
            let detail = error_response.error;
            let error_type = detail.error_type.as_deref().unwrap_or("unknown");
            let details = serde_json::json!({
                "status": status.as_u16(),
                "type": error_type,
                "code": detail.code,
            });

            let error = match status.as_u16() {
                401 | 403 => AppError::new(
                    ErrorCode::ExternalAuthFailed,
                    format!("API authentication failed: {}", detail.message),
                ),
                429 => AppError::new(
                    ErrorCode::ExternalRateLimited,
                    format!("API rate limit reached: {}", detail.message),
                ),
                500..=599 => AppError::new(
                    ErrorCode::ExternalServiceUnavailable,
                    format!("{SERVICE_NAME}: {} - {}", error_type, detail.message),
                ),
                _ => AppError::external_service(
                    SERVICE_NAME,
                    format!("{} - {}", error_type, detail.message),
                ),
            };
            error.with_details(details)
        } else {
            match status.as_u16() {
                502..=504 => AppError::new(
                    ErrorCode::ExternalServiceUnavailable,
                    format!("{SERVICE_NAME} is not responding ({status})"),
                ),
                _ => AppError::external_service(
                    SERVICE_NAME,
                    format!(
                        "API error ({}): {}",
                        status,
                        body.chars().take(200).collect::<String>()
                    ),
                ),
            }
        }
    }

    /// Map a transport failure
    fn transport_error(&self, operation: &str, e: &reqwest::Error) -> AppError {
        error!("Failed to send {} request: {}", operation, e);
        if e.is_connect() || e.is_timeout() {
            AppError::new(
                ErrorCode::ExternalServiceUnavailable,
                format!(
                    "Cannot reach {SERVICE_NAME} at {} during {operation}: {e}",
                    self.config.base_url
                ),
            )
        } else {
            AppError::external_service(SERVICE_NAME, format!("{operation} failed: {e}"))
        }
    }

    /// Send a request and return the successful response body
    async fn execute(&self, operation: &str, request: RequestBuilder) -> AppResult<String> {
        let response = self
            .add_headers(request)
            .send()
            .await
            .map_err(|e| self.transport_error(operation, &e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!("Failed to read {} response: {}", operation, e);
            AppError::external_service(SERVICE_NAME, format!("Failed to read response: {e}"))
        })?;

        if !status.is_success() {
            debug!(operation, %status, "Remote API returned an error");
            return Err(Self::parse_error_response(status, &body));
        }

        Ok(body)
    }

    /// Send a request and decode the JSON response
    async fn execute_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> AppResult<T> {
        let body = self.execute(operation, request).await?;
        serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse {} response: {}", operation, e);
            AppError::external_service(SERVICE_NAME, format!("Failed to parse response: {e}"))
        })
    }
}

#[async_trait]
impl AssistantProvider for OpenAiAssistantsProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    #[instrument(skip(self, request), fields(name = %request.name, model = %request.model))]
    async fn create_assistant(
        &self,
        request: &CreateAssistantRequest,
    ) -> AppResult<AssistantObject> {
        let http_request = self.client.post(self.api_url("assistants")).json(request);
        let assistant: AssistantObject = self.execute_json("create assistant", http_request).await?;
        debug!(assistant_id = %assistant.id, "Created remote assistant");
        Ok(assistant)
    }

    #[instrument(skip(self, request))]
    async fn modify_assistant(
        &self,
        assistant_id: &str,
        request: &ModifyAssistantRequest,
    ) -> AppResult<AssistantObject> {
        let http_request = self
            .client
            .post(self.api_url(&format!("assistants/{assistant_id}")))
            .json(request);
        self.execute_json("modify assistant", http_request).await
    }

    #[instrument(skip(self))]
    async fn create_thread(&self) -> AppResult<ThreadObject> {
        let http_request = self
            .client
            .post(self.api_url("threads"))
            .json(&serde_json::json!({}));
        self.execute_json("create thread", http_request).await
    }

    #[instrument(skip(self))]
    async fn retrieve_thread(&self, thread_id: &str) -> AppResult<ThreadObject> {
        let http_request = self.client.get(self.api_url(&format!("threads/{thread_id}")));
        self.execute_json("retrieve thread", http_request).await
    }

    #[instrument(skip(self, content), fields(content_len = content.len()))]
    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> AppResult<ThreadMessage> {
        let http_request = self
            .client
            .post(self.api_url(&format!("threads/{thread_id}/messages")))
            .json(&CreateMessageBody {
                role: role.as_str(),
                content,
            });
        self.execute_json("create message", http_request).await
    }

    #[instrument(skip(self))]
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> AppResult<RunObject> {
        let http_request = self
            .client
            .post(self.api_url(&format!("threads/{thread_id}/runs")))
            .json(&CreateRunBody { assistant_id });
        let raw: Value = self.execute_json("create run", http_request).await?;
        RunObject::from_value(raw)
    }

    #[instrument(skip(self))]
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> AppResult<RunObject> {
        let http_request = self
            .client
            .get(self.api_url(&format!("threads/{thread_id}/runs/{run_id}")));
        let raw: Value = self.execute_json("retrieve run", http_request).await?;
        RunObject::from_value(raw)
    }

    #[instrument(skip(self))]
    async fn list_messages(&self, thread_id: &str) -> AppResult<Vec<ThreadMessage>> {
        let url = self.api_url(&format!("threads/{thread_id}/messages"));
        let limit = MESSAGE_LIST_LIMIT.to_string();
        let mut messages = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut http_request = self
                .client
                .get(&url)
                .query(&[("order", "asc"), ("limit", limit.as_str())]);
            if let Some(cursor) = after.as_deref() {
                http_request = http_request.query(&[("after", cursor)]);
            }

            let page: MessageList = self.execute_json("list messages", http_request).await?;
            messages.extend(page.data);

            match page.last_id {
                Some(last_id) if page.has_more => after = Some(last_id),
                _ => break,
            }
        }

        debug!(count = messages.len(), "Listed thread messages");
        Ok(messages)
    }
}
