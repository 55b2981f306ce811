// ABOUTME: Assistant configuration, persisted assistant record and session state types
// ABOUTME: Validates submitted parameters and defines the send-message reply payload
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::llm::{CreateAssistantRequest, ModifyAssistantRequest};

/// Configuration submitted for an assistant
///
/// Missing JSON fields deserialize as empty strings so that [`Self::validate`]
/// reports them by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantParams {
    /// Logical assistant name, also the key of its [`AssistantRecord`]
    #[serde(default)]
    pub name: String,
    /// Model identifier
    #[serde(default)]
    pub model: String,
    /// Instruction text
    #[serde(default)]
    pub instructions: String,
    /// Initial user input
    #[serde(default, rename = "userInput")]
    pub user_input: String,
}

impl AssistantParams {
    /// Build params from their parts
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        instructions: impl Into<String>,
        user_input: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            instructions: instructions.into(),
            user_input: user_input.into(),
        }
    }

    /// Check that every field is present and not blank
    ///
    /// # Errors
    ///
    /// Returns a missing-field error naming the first blank field
    pub fn validate(&self) -> AppResult<()> {
        self.validate_assistant_fields()?;
        if self.user_input.trim().is_empty() {
            return Err(AppError::missing_field("userInput"));
        }
        Ok(())
    }

    /// Check the fields needed to create the remote assistant (name, model, instructions)
    ///
    /// # Errors
    ///
    /// Returns a missing-field error naming the first blank field
    pub fn validate_assistant_fields(&self) -> AppResult<()> {
        self.validate_name()?;
        if self.model.trim().is_empty() {
            return Err(AppError::missing_field("model"));
        }
        if self.instructions.trim().is_empty() {
            return Err(AppError::missing_field("instructions"));
        }
        Ok(())
    }

    /// Check that the logical name is present and not blank
    ///
    /// # Errors
    ///
    /// Returns a missing-field error for `name`
    pub fn validate_name(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::missing_field("name"));
        }
        Ok(())
    }

    /// Remote create-assistant payload; the user input is not sent
    #[must_use]
    pub fn to_create_request(&self) -> CreateAssistantRequest {
        CreateAssistantRequest {
            name: self.name.clone(),
            model: self.model.clone(),
            instructions: self.instructions.clone(),
        }
    }

    /// Remote modify-assistant payload holding only the fields that differ from `current`
    #[must_use]
    pub fn diff_from(&self, current: &Self) -> ModifyAssistantRequest {
        ModifyAssistantRequest {
            model: (self.model != current.model).then(|| self.model.clone()),
            instructions: (self.instructions != current.instructions)
                .then(|| self.instructions.clone()),
        }
    }
}

/// Persisted association of an assistant name with its remote id
///
/// Stored as JSON under the plain key `<name>`: the submitted params with `id` added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantRecord {
    /// Params the assistant was created (or last patched) with
    #[serde(flatten)]
    pub params: AssistantParams,
    /// Remote assistant id
    pub id: String,
}

/// Initialization state of an assistant session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Initialization has not run yet
    Uninitialized,
    /// Remote identity known
    Ready {
        /// Remote assistant id
        assistant_id: String,
    },
    /// Initialization ran and failed; not retried
    Failed {
        /// Failure description
        reason: String,
    },
}

impl SessionState {
    /// Remote assistant id when ready
    #[must_use]
    pub fn assistant_id(&self) -> Option<&str> {
        match self {
            Self::Ready { assistant_id } => Some(assistant_id),
            Self::Uninitialized | Self::Failed { .. } => None,
        }
    }

    /// Whether the session can run messages
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Whether initialization failed
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of one send-message exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReply {
    /// Text of the latest assistant message
    pub response: String,
    /// Thread the exchange ran on
    pub thread_id: String,
}
