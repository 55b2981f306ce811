// ABOUTME: Assistant session owning one assistant's remote identity and its run protocol
// ABOUTME: One-shot initialization, thread resolution and the bounded run polling loop
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Assistant Session
//!
//! A session binds one [`AssistantParams`] configuration to a remote assistant.
//! Initialization runs once: an existing [`AssistantRecord`] stored under the
//! assistant name is adopted, otherwise the remote assistant is created and the
//! record written. The outcome is kept as a [`SessionState`]; a failed
//! initialization is final for the session.
//!
//! Sending a message follows a fixed sequence: resolve the thread, append the
//! user message, start a run, poll the run until it completes, then read the
//! latest assistant message.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use super::params::{AssistantParams, AssistantRecord, MessageReply, SessionState};
use crate::config::environment::RunPollConfig;
use crate::errors::{AppError, AppResult};
use crate::llm::{AssistantProvider, MessageRole, RunStatus, ThreadMessage};
use crate::store::{self, KeyValueStore};

/// One assistant configuration and its remote identity
pub struct AssistantSession {
    name: String,
    params: RwLock<AssistantParams>,
    state: Mutex<SessionState>,
    provider: Arc<dyn AssistantProvider>,
    store: Arc<dyn KeyValueStore>,
    poll: RunPollConfig,
}

impl AssistantSession {
    /// Create an uninitialized session
    #[must_use]
    pub fn new(
        params: AssistantParams,
        provider: Arc<dyn AssistantProvider>,
        store: Arc<dyn KeyValueStore>,
        poll: RunPollConfig,
    ) -> Self {
        Self {
            name: params.name.clone(),
            params: RwLock::new(params),
            state: Mutex::new(SessionState::Uninitialized),
            provider,
            store,
            poll,
        }
    }

    /// Logical assistant name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Params the remote assistant currently runs with
    pub async fn params(&self) -> AssistantParams {
        self.params.read().await.clone()
    }

    /// Current initialization state
    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Remote assistant id, when ready
    pub async fn assistant_id(&self) -> Option<String> {
        self.state.lock().await.assistant_id().map(str::to_owned)
    }

    /// Resolve the remote identity once
    ///
    /// Concurrent callers wait for the first one; later calls report the stored outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote assistant could not be created, now or on
    /// the first attempt
    #[instrument(skip(self), fields(assistant = %self.name))]
    pub async fn initialize(&self) -> AppResult<()> {
        let mut state = self.state.lock().await;

        match &*state {
            SessionState::Ready { .. } => return Ok(()),
            SessionState::Failed { reason } => {
                return Err(AppError::assistant_not_ready(&self.name)
                    .with_details(serde_json::json!({ "reason": reason })));
            }
            SessionState::Uninitialized => {}
        }

        if let Some(record) = self.lookup_record(&self.name).await {
            info!(assistant_id = %record.id, "Adopting existing assistant");
            *self.params.write().await = record.params;
            *state = SessionState::Ready {
                assistant_id: record.id,
            };
            return Ok(());
        }

        let params = self.params().await;
        match self.provision_remote(&params).await {
            Ok(assistant_id) => {
                *state = SessionState::Ready { assistant_id };
                Ok(())
            }
            Err(e) => {
                *state = SessionState::Failed {
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }

    /// Look up the persisted record for `name` and adopt its id when present
    pub async fn check_existence(&self, name: &str) -> bool {
        let Some(record) = self.lookup_record(name).await else {
            return false;
        };

        *self.params.write().await = record.params;
        *self.state.lock().await = SessionState::Ready {
            assistant_id: record.id,
        };
        true
    }

    /// Create the remote assistant from `params`, adopt its id and persist the record
    ///
    /// # Errors
    ///
    /// Returns an error if the remote API rejects the creation; the session is
    /// then marked failed
    pub async fn create_remote(&self, params: &AssistantParams) -> AppResult<()> {
        match self.provision_remote(params).await {
            Ok(assistant_id) => {
                *self.params.write().await = params.clone();
                *self.state.lock().await = SessionState::Ready { assistant_id };
                Ok(())
            }
            Err(e) => {
                *self.state.lock().await = SessionState::Failed {
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }

    /// Patch the remote assistant when `desired` changes its model or instructions
    ///
    /// The comparison baseline is the persisted record for this assistant name,
    /// which other sessions sharing the name may have rewritten. Without a
    /// readable record for the same remote id, the session's own params are used.
    /// Returns whether a patch was sent. Sessions that are not ready are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote patch fails
    #[instrument(skip(self, desired), fields(assistant = %self.name))]
    pub async fn update_remote(&self, desired: &AssistantParams) -> AppResult<bool> {
        let Some(assistant_id) = self.assistant_id().await else {
            debug!("Session not ready, skipping remote update");
            return Ok(false);
        };

        let current = match self.lookup_record(&self.name).await {
            Some(record) if record.id == assistant_id => {
                *self.params.write().await = record.params.clone();
                record.params
            }
            _ => self.params().await,
        };
        let changes = desired.diff_from(&current);
        if changes.is_empty() {
            return Ok(false);
        }

        self.provider
            .modify_assistant(&assistant_id, &changes)
            .await?;

        let updated = AssistantParams {
            model: desired.model.clone(),
            instructions: desired.instructions.clone(),
            ..current
        };
        *self.params.write().await = updated.clone();
        self.persist_record(&updated, &assistant_id).await;

        info!(assistant_id = %assistant_id, "Updated remote assistant");
        Ok(true)
    }

    /// Return `thread_id` if the remote still knows it, otherwise a fresh thread
    ///
    /// # Errors
    ///
    /// Returns an error if a new thread cannot be created
    pub async fn get_or_create_thread(&self, thread_id: Option<&str>) -> AppResult<String> {
        if let Some(id) = thread_id {
            match self.provider.retrieve_thread(id).await {
                Ok(thread) => return Ok(thread.id),
                Err(e) => {
                    warn!(thread_id = %id, "Stored thread unusable, creating a new one: {}", e);
                }
            }
        }

        let thread = self.provider.create_thread().await?;
        debug!(thread_id = %thread.id, "Created thread");
        Ok(thread.id)
    }

    /// Post `message` on a thread, run the assistant and return its reply
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not ready, a remote call fails, the
    /// run fails, or the run does not complete within the polling budget
    #[instrument(skip(self, message), fields(assistant = %self.name))]
    pub async fn send_message_and_get_response(
        &self,
        thread_id: Option<&str>,
        message: &str,
    ) -> AppResult<MessageReply> {
        let state = self.state().await;
        let Some(assistant_id) = state.assistant_id() else {
            let reason = match &state {
                SessionState::Failed { reason } => reason.as_str(),
                SessionState::Uninitialized | SessionState::Ready { .. } => "not initialized",
            };
            return Err(AppError::assistant_not_ready(&self.name)
                .with_details(serde_json::json!({ "reason": reason })));
        };

        let thread_id = self.get_or_create_thread(thread_id).await?;

        self.provider
            .create_message(&thread_id, MessageRole::User, message)
            .await?;

        let run = self.provider.create_run(&thread_id, assistant_id).await?;
        debug!(run_id = %run.id, thread_id = %thread_id, "Started run");

        self.wait_for_run(&thread_id, &run.id).await?;

        let messages = self.provider.list_messages(&thread_id).await?;
        Ok(MessageReply {
            response: latest_assistant_reply(&messages),
            thread_id,
        })
    }

    /// Poll a run until it completes; returns the number of polls made
    async fn wait_for_run(&self, thread_id: &str, run_id: &str) -> AppResult<u32> {
        for attempt in 1..=self.poll.max_attempts {
            tokio::time::sleep(self.poll.interval()).await;

            let run = self.provider.retrieve_run(thread_id, run_id).await?;
            debug!(run_id = %run_id, attempt, status = %run.status, "Polled run");

            match run.status {
                RunStatus::Completed => return Ok(attempt),
                RunStatus::Failed => {
                    error!(run_id = %run_id, "Run failed: {}", run.raw);
                    return Err(AppError::run_failed(run.id, run.raw));
                }
                _ => {}
            }
        }

        warn!(run_id = %run_id, attempts = self.poll.max_attempts, "Run did not complete");
        Err(AppError::run_timeout(run_id, self.poll.max_attempts))
    }

    /// Read the record for `name`; store failures and undecodable records count as absent
    async fn lookup_record(&self, name: &str) -> Option<AssistantRecord> {
        match store::get_json::<AssistantRecord>(self.store.as_ref(), name).await {
            Ok(record) => record,
            Err(e) => {
                warn!(assistant = %name, "Assistant record lookup failed, treating as absent: {}", e);
                None
            }
        }
    }

    /// Create the remote assistant and persist its record; returns the new id
    async fn provision_remote(&self, params: &AssistantParams) -> AppResult<String> {
        let assistant = self
            .provider
            .create_assistant(&params.to_create_request())
            .await
            .inspect_err(|e| {
                error!(assistant = %params.name, "Failed to create remote assistant: {}", e);
            })?;

        info!(assistant = %params.name, assistant_id = %assistant.id, "Created remote assistant");
        self.persist_record(params, &assistant.id).await;
        Ok(assistant.id)
    }

    async fn persist_record(&self, params: &AssistantParams, assistant_id: &str) {
        let record = AssistantRecord {
            params: params.clone(),
            id: assistant_id.to_owned(),
        };
        if let Err(e) = store::set_json(self.store.as_ref(), &params.name, &record).await {
            error!(assistant = %params.name, "Failed to persist assistant record: {}", e);
        }
    }
}

/// Content of the newest assistant-authored message, or an empty string
#[must_use]
pub fn latest_assistant_reply(messages: &[ThreadMessage]) -> String {
    messages
        .iter()
        .rev()
        .find(|message| message.role == MessageRole::Assistant)
        .map(|message| message.content.to_text())
        .unwrap_or_default()
}
