// ABOUTME: Assistant registry mapping (client, assistant type) pairs to threads and sessions
// ABOUTME: Reconciles submitted configuration with persisted mappings and cached sessions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Assistant Registry
//!
//! Entry point of the assistant core. For each `(client, assistant type)` pair
//! the registry keeps:
//!
//! - the thread id, persisted in the hash `cliente:<client>:assistants`
//! - the last submitted params, persisted in `cliente:<client>:assistant-params`
//! - one cached [`AssistantSession`] for the life of the process
//!
//! Provisioning a new pair is serialized per pair in-process and the thread
//! mapping is written with a create-if-absent primitive, so concurrent callers
//! (in this process or another) agree on a single thread id.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::params::{AssistantParams, MessageReply, SessionState};
use super::session::AssistantSession;
use crate::config::environment::RunPollConfig;
use crate::constants::store_keys;
use crate::errors::{AppError, AppResult};
use crate::llm::AssistantProvider;
use crate::store::KeyValueStore;

type SessionsByType = DashMap<String, Arc<AssistantSession>>;

/// Registry of assistant sessions and thread mappings
pub struct AssistantRegistry {
    store: Arc<dyn KeyValueStore>,
    provider: Arc<dyn AssistantProvider>,
    poll: RunPollConfig,
    sessions: DashMap<String, SessionsByType>,
    provisioning: DashMap<(String, String), Arc<Mutex<()>>>,
}

impl AssistantRegistry {
    /// Create a registry over the given store and remote provider
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn AssistantProvider>,
        poll: RunPollConfig,
    ) -> Self {
        Self {
            store,
            provider,
            poll,
            sessions: DashMap::new(),
            provisioning: DashMap::new(),
        }
    }

    /// Store handle shared with sessions
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Return the thread id for a pair, provisioning assistant and thread on first use
    ///
    /// An existing pair goes through [`Self::update_assistant`] and keeps its thread id.
    ///
    /// # Errors
    ///
    /// Returns an error if `params.name` is blank, the store is unavailable, or
    /// the assistant or thread cannot be created
    #[instrument(skip(self, params), fields(assistant = %params.name))]
    pub async fn create_or_update_assistant(
        &self,
        client_id: &str,
        assistant_type: &str,
        params: &AssistantParams,
    ) -> AppResult<String> {
        params.validate_name()?;

        if let Some(thread_id) = self.thread_id_for(client_id, assistant_type).await? {
            self.update_assistant(client_id, assistant_type, params)
                .await?;
            return Ok(thread_id);
        }

        let lock = self.provisioning_lock(client_id, assistant_type);
        let _guard = lock.lock().await;

        // Another request may have provisioned the pair while we waited
        if let Some(thread_id) = self.thread_id_for(client_id, assistant_type).await? {
            self.update_assistant(client_id, assistant_type, params)
                .await?;
            return Ok(thread_id);
        }

        let session = self
            .ready_session(client_id, assistant_type, params)
            .await?;
        let thread_id = session.get_or_create_thread(None).await?;

        let mapping_key = store_keys::client_assistants(client_id);
        let written = self
            .store
            .hset_if_absent(&mapping_key, assistant_type, &thread_id)
            .await?;
        self.persist_params(client_id, assistant_type, params)
            .await?;

        if written {
            info!(
                client_id = %client_id,
                assistant_type = %assistant_type,
                thread_id = %thread_id,
                "Provisioned assistant thread"
            );
            return Ok(thread_id);
        }

        // Lost the race against another instance; its mapping wins
        let winner = self
            .store
            .hget(&mapping_key, assistant_type)
            .await?
            .unwrap_or(thread_id);
        warn!(
            client_id = %client_id,
            assistant_type = %assistant_type,
            thread_id = %winner,
            "Thread mapping written concurrently, using existing thread"
        );
        Ok(winner)
    }

    /// Persist new params for an existing pair and patch the remote assistant
    ///
    /// The thread mapping is never modified.
    ///
    /// # Errors
    ///
    /// Returns not-found if the pair has no thread mapping, or an error if the
    /// store is unavailable
    #[instrument(skip(self, params), fields(assistant = %params.name))]
    pub async fn update_assistant(
        &self,
        client_id: &str,
        assistant_type: &str,
        params: &AssistantParams,
    ) -> AppResult<()> {
        if self
            .thread_id_for(client_id, assistant_type)
            .await?
            .is_none()
        {
            return Err(AppError::not_found(format!(
                "Assistant '{assistant_type}' for client '{client_id}'"
            )));
        }

        self.persist_params(client_id, assistant_type, params)
            .await?;

        let session = self
            .get_assistant_manager(client_id, assistant_type, params)
            .await;
        match session.update_remote(params).await {
            Ok(true) => info!(
                client_id = %client_id,
                assistant_type = %assistant_type,
                "Remote assistant updated"
            ),
            Ok(false) => debug!("Remote assistant unchanged"),
            Err(e) => warn!(
                client_id = %client_id,
                assistant_type = %assistant_type,
                "Failed to update remote assistant, keeping previous configuration: {}",
                e
            ),
        }

        Ok(())
    }

    /// Return the cached session for a pair, creating and initializing it if absent
    ///
    /// Initialization failures are logged; the returned session then reports
    /// [`SessionState::Failed`].
    pub async fn get_assistant_manager(
        &self,
        client_id: &str,
        assistant_type: &str,
        params: &AssistantParams,
    ) -> Arc<AssistantSession> {
        let session = {
            let by_type = self
                .sessions
                .entry(client_id.to_owned())
                .or_insert_with(DashMap::new);
            let cached = by_type
                .entry(assistant_type.to_owned())
                .or_insert_with(|| {
                    Arc::new(AssistantSession::new(
                        params.clone(),
                        Arc::clone(&self.provider),
                        Arc::clone(&self.store),
                        self.poll,
                    ))
                });
            Arc::clone(cached.value())
        };

        if let Err(e) = session.initialize().await {
            warn!(
                client_id = %client_id,
                assistant_type = %assistant_type,
                "Assistant session not ready: {}",
                e
            );
        }

        session
    }

    /// Send a message on the pair's thread and return the assistant reply
    ///
    /// A missing or unusable thread is replaced and the new id persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable, the session is not ready,
    /// or the run fails or times out
    #[instrument(skip(self, params, message), fields(assistant = %params.name))]
    pub async fn send_message(
        &self,
        client_id: &str,
        assistant_type: &str,
        params: &AssistantParams,
        message: &str,
    ) -> AppResult<MessageReply> {
        params.validate_name()?;

        let stored = self.thread_id_for(client_id, assistant_type).await?;
        let session = self
            .ready_session(client_id, assistant_type, params)
            .await?;

        let reply = session
            .send_message_and_get_response(stored.as_deref(), message)
            .await?;

        if stored.as_deref() != Some(reply.thread_id.as_str()) {
            self.store
                .hset(
                    &store_keys::client_assistants(client_id),
                    assistant_type,
                    &reply.thread_id,
                )
                .await?;
            info!(
                client_id = %client_id,
                assistant_type = %assistant_type,
                thread_id = %reply.thread_id,
                "Stored new thread for assistant"
            );
        }

        Ok(reply)
    }

    /// Persisted thread id for a pair
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable
    pub async fn thread_id_for(
        &self,
        client_id: &str,
        assistant_type: &str,
    ) -> AppResult<Option<String>> {
        self.store
            .hget(&store_keys::client_assistants(client_id), assistant_type)
            .await
    }

    /// Cached session for a pair, without creating one
    #[must_use]
    pub fn cached_session(
        &self,
        client_id: &str,
        assistant_type: &str,
    ) -> Option<Arc<AssistantSession>> {
        self.sessions
            .get(client_id)
            .and_then(|by_type| by_type.get(assistant_type).map(|s| Arc::clone(s.value())))
    }

    /// Cached session that finished initialization successfully
    ///
    /// A failed session stays cached; its initialization is not retried. One
    /// transient remote error during the first provisioning of a pair
    /// therefore makes the pair answer `ASSISTANT_NOT_READY` (503) until the
    /// process restarts.
    async fn ready_session(
        &self,
        client_id: &str,
        assistant_type: &str,
        params: &AssistantParams,
    ) -> AppResult<Arc<AssistantSession>> {
        let session = self
            .get_assistant_manager(client_id, assistant_type, params)
            .await;

        let state = session.state().await;
        if state.is_ready() {
            return Ok(session);
        }

        let reason = match state {
            SessionState::Failed { reason } => reason,
            SessionState::Uninitialized | SessionState::Ready { .. } => "not initialized".to_owned(),
        };
        Err(AppError::assistant_not_ready(session.name())
            .with_details(serde_json::json!({ "reason": reason })))
    }

    async fn persist_params(
        &self,
        client_id: &str,
        assistant_type: &str,
        params: &AssistantParams,
    ) -> AppResult<()> {
        let encoded = serde_json::to_string(params)?;
        self.store
            .hset(
                &store_keys::client_assistant_params(client_id),
                assistant_type,
                &encoded,
            )
            .await?;
        Ok(())
    }

    fn provisioning_lock(&self, client_id: &str, assistant_type: &str) -> Arc<Mutex<()>> {
        let lock = self
            .provisioning
            .entry((client_id.to_owned(), assistant_type.to_owned()))
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Arc::clone(lock.value())
    }
}
