// ABOUTME: Remote assistants API abstraction: assistants, threads, messages and runs
// ABOUTME: Defines the provider contract and the wire types shared by every implementation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Assistant Provider Interface
//!
//! The assistant core talks to a remote, stateful assistants API: assistants are
//! named model configurations, threads hold conversations, and runs execute an
//! assistant against a thread asynchronously.
//!
//! ## Key Concepts
//!
//! - **`AssistantProvider`**: async trait the session drives; injected as
//!   `Arc<dyn AssistantProvider>` so tests can script remote behavior
//! - **`RunObject`**: run state plus the raw payload, kept for error reporting
//! - **`MessageContent`**: plain text or multipart content of a thread message
//!
//! ## Example
//!
//! ```rust,no_run
//! use assistant_hub::llm::{AssistantProvider, CreateAssistantRequest};
//!
//! async fn example(provider: &dyn AssistantProvider) {
//!     let request = CreateAssistantRequest {
//!         name: "support-bot".to_owned(),
//!         model: "gpt-4o-mini".to_owned(),
//!         instructions: "Answer support questions".to_owned(),
//!     };
//!     let assistant = provider.create_assistant(&request).await;
//! }
//! ```

mod openai_assistants;

pub use openai_assistants::OpenAiAssistantsProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppResult;

// ============================================================================
// Messages
// ============================================================================

/// Role of a thread message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// End user input
    User,
    /// Assistant output
    Assistant,
}

impl MessageRole {
    /// Wire representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Text of a content part; either a bare string or an annotated text object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartText {
    /// `"text": "..."`
    Plain(String),
    /// `"text": { "value": "...", "annotations": [...] }`
    Annotated {
        /// Text value
        value: String,
    },
}

impl PartText {
    fn as_str(&self) -> &str {
        match self {
            Self::Plain(text) | Self::Annotated { value: text } => text,
        }
    }
}

/// One part of multipart message content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPart {
    /// Part type (`text`, `image_file`, `image_url`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Text payload for `text` parts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<PartText>,
}

impl ContentPart {
    /// Build a text part
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: "text".to_owned(),
            text: Some(PartText::Annotated {
                value: value.into(),
            }),
        }
    }
}

/// Content of a thread message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain string content
    Text(String),
    /// Structured multipart content
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Extract the textual reply
    ///
    /// Plain content is returned as-is; multipart content yields the
    /// concatenation of its text parts, or an empty string when it has none.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter(|part| part.kind == "text")
                .filter_map(|part| part.text.as_ref())
                .map(PartText::as_str)
                .collect(),
        }
    }
}

/// Message stored in a remote thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Message id
    #[serde(default)]
    pub id: String,
    /// Author role
    pub role: MessageRole,
    /// Message content
    pub content: MessageContent,
    /// Creation time (unix seconds)
    #[serde(default)]
    pub created_at: i64,
}

impl ThreadMessage {
    /// Build a plain-text message
    #[must_use]
    pub fn new(id: impl Into<String>, role: MessageRole, content: MessageContent) -> Self {
        Self {
            id: id.into(),
            role,
            content,
            created_at: 0,
        }
    }
}

// ============================================================================
// Assistants and Threads
// ============================================================================

/// Parameters sent to create-assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAssistantRequest {
    /// Logical assistant name
    pub name: String,
    /// Model identifier
    pub model: String,
    /// System instructions
    pub instructions: String,
}

/// Fields patched by modify-assistant; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyAssistantRequest {
    /// New model identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// New instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl ModifyAssistantRequest {
    /// Whether the request changes anything
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.model.is_none() && self.instructions.is_none()
    }
}

/// Remote assistant object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantObject {
    /// Remote assistant id
    pub id: String,
    /// Assistant name
    #[serde(default)]
    pub name: Option<String>,
    /// Model identifier
    #[serde(default)]
    pub model: String,
    /// Instructions
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Remote thread object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadObject {
    /// Remote thread id
    pub id: String,
}

// ============================================================================
// Runs
// ============================================================================

/// Lifecycle state of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    /// Waiting to start
    Queued,
    /// Executing
    InProgress,
    /// Waiting on tool outputs
    RequiresAction,
    /// Cancellation requested
    Cancelling,
    /// Cancelled
    Cancelled,
    /// Terminated with an error
    Failed,
    /// Finished successfully
    Completed,
    /// Finished without a full result
    Incomplete,
    /// Timed out remotely
    Expired,
    /// Any status not known to this client
    Other(String),
}

impl RunStatus {
    /// Wire representation
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Other(status) => status,
        }
    }
}

impl From<String> for RunStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "queued" => Self::Queued,
            "in_progress" => Self::InProgress,
            "requires_action" => Self::RequiresAction,
            "cancelling" => Self::Cancelling,
            "cancelled" => Self::Cancelled,
            "failed" => Self::Failed,
            "completed" => Self::Completed,
            "incomplete" => Self::Incomplete,
            "expired" => Self::Expired,
            _ => Self::Other(value),
        }
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        status.as_str().to_owned()
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote run with its full payload
#[derive(Debug, Clone, PartialEq)]
pub struct RunObject {
    /// Run id
    pub id: String,
    /// Current status
    pub status: RunStatus,
    /// Complete run payload as returned by the remote API
    pub raw: Value,
}

impl RunObject {
    /// Build a run whose raw payload holds only id and status
    #[must_use]
    pub fn new(id: impl Into<String>, status: RunStatus) -> Self {
        let id = id.into();
        let raw = serde_json::json!({ "id": id, "status": status.as_str() });
        Self { id, status, raw }
    }

    /// Parse a run from its raw payload, keeping the payload
    ///
    /// # Errors
    ///
    /// Returns an error if `id` or `status` is missing
    pub fn from_value(raw: Value) -> AppResult<Self> {
        #[derive(Deserialize)]
        struct RunHead {
            id: String,
            status: RunStatus,
        }

        let head: RunHead = serde_json::from_value(raw.clone())?;
        Ok(Self {
            id: head.id,
            status: head.status,
            raw,
        })
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Remote assistants API used by assistant sessions
#[async_trait]
pub trait AssistantProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Create an assistant
    async fn create_assistant(&self, request: &CreateAssistantRequest)
        -> AppResult<AssistantObject>;

    /// Patch an existing assistant
    async fn modify_assistant(
        &self,
        assistant_id: &str,
        request: &ModifyAssistantRequest,
    ) -> AppResult<AssistantObject>;

    /// Create an empty thread
    async fn create_thread(&self) -> AppResult<ThreadObject>;

    /// Retrieve a thread; fails if it does not exist
    async fn retrieve_thread(&self, thread_id: &str) -> AppResult<ThreadObject>;

    /// Append a message to a thread
    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> AppResult<ThreadMessage>;

    /// Start a run of an assistant against a thread
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> AppResult<RunObject>;

    /// Fetch the current state of a run
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> AppResult<RunObject>;

    /// List all messages of a thread, oldest first
    async fn list_messages(&self, thread_id: &str) -> AppResult<Vec<ThreadMessage>>;
}
