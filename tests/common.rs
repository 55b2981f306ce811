// ABOUTME: Shared test utilities and fakes for integration tests
// ABOUTME: Provides a scripted assistant provider, failing stores and registry setup helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `assistant_hub`
//!
//! This module provides common fakes and setup functions to reduce duplication
//! across integration tests.

use assistant_hub::{
    assistant::{AssistantParams, AssistantRegistry},
    config::environment::{RunPollConfig, ServerConfig, StoreConfig},
    errors::{AppError, AppResult},
    llm::{
        AssistantObject, AssistantProvider, CreateAssistantRequest, MessageContent, MessageRole,
        ModifyAssistantRequest, RunObject, RunStatus, ThreadMessage, ThreadObject,
    },
    server::ServerResources,
    store::{memory::InMemoryStore, KeyValueStore},
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Poll settings that keep tests fast
pub const fn fast_poll() -> RunPollConfig {
    RunPollConfig {
        interval_ms: 1,
        max_attempts: 5,
    }
}

/// Params with every field filled in
pub fn params(name: &str, model: &str, instructions: &str) -> AssistantParams {
    AssistantParams::new(name, model, instructions, "hello")
}

// ============================================================================
// Fake Assistant Provider
// ============================================================================

/// In-process stand-in for the remote assistants API
///
/// Threads it created are retrievable; any other id fails retrieval. Run
/// statuses are served from a script, repeating the last entry once exhausted.
#[derive(Default)]
pub struct FakeAssistantProvider {
    next_id: AtomicUsize,
    pub assistants_created: AtomicUsize,
    pub assistants_modified: AtomicUsize,
    pub threads_created: AtomicUsize,
    pub messages_created: AtomicUsize,
    pub runs_created: AtomicUsize,
    pub run_polls: AtomicUsize,
    pub fail_create_assistant: AtomicBool,
    create_thread_delay: Mutex<Duration>,
    threads: Mutex<HashSet<String>>,
    thread_messages: Mutex<HashMap<String, Vec<ThreadMessage>>>,
    run_script: Mutex<VecDeque<RunStatus>>,
    last_status: Mutex<Option<RunStatus>>,
    assistant_reply: Mutex<Option<MessageContent>>,
    last_modify: Mutex<Option<(String, ModifyAssistantRequest)>>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeAssistantProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Statuses returned by successive `retrieve_run` calls
    pub fn script_runs(&self, statuses: Vec<RunStatus>) {
        *self.run_script.lock().unwrap() = statuses.into();
    }

    /// Assistant message appended to a thread when a run starts
    pub fn reply_with(&self, content: MessageContent) {
        *self.assistant_reply.lock().unwrap() = Some(content);
    }

    /// Plain-text assistant reply
    pub fn reply_text(&self, text: &str) {
        self.reply_with(MessageContent::Text(text.to_owned()));
    }

    /// Slow down thread creation to widen race windows
    pub fn set_create_thread_delay(&self, delay: Duration) {
        *self.create_thread_delay.lock().unwrap() = delay;
    }

    /// Append a message to a thread directly
    pub fn push_message(&self, thread_id: &str, role: MessageRole, content: MessageContent) {
        let id = self.fresh_id("msg");
        self.thread_messages
            .lock()
            .unwrap()
            .entry(thread_id.to_owned())
            .or_default()
            .push(ThreadMessage::new(id, role, content));
    }

    /// Names of provider calls in order
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_modify(&self) -> Option<(String, ModifyAssistantRequest)> {
        self.last_modify.lock().unwrap().clone()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn fresh_id(&self, prefix: &str) -> String {
        format!("{prefix}_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_status(&self) -> RunStatus {
        let scripted = self.run_script.lock().unwrap().pop_front();
        let mut last = self.last_status.lock().unwrap();
        match scripted {
            Some(status) => {
                *last = Some(status.clone());
                status
            }
            None => last.clone().unwrap_or(RunStatus::Completed),
        }
    }
}

#[async_trait]
impl AssistantProvider for FakeAssistantProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn create_assistant(
        &self,
        request: &CreateAssistantRequest,
    ) -> AppResult<AssistantObject> {
        self.record("create_assistant");
        if self.fail_create_assistant.load(Ordering::SeqCst) {
            return Err(AppError::external_service("fake", "assistant creation rejected"));
        }
        self.assistants_created.fetch_add(1, Ordering::SeqCst);
        Ok(AssistantObject {
            id: self.fresh_id("asst"),
            name: Some(request.name.clone()),
            model: request.model.clone(),
            instructions: Some(request.instructions.clone()),
        })
    }

    async fn modify_assistant(
        &self,
        assistant_id: &str,
        request: &ModifyAssistantRequest,
    ) -> AppResult<AssistantObject> {
        self.record("modify_assistant");
        self.assistants_modified.fetch_add(1, Ordering::SeqCst);
        *self.last_modify.lock().unwrap() = Some((assistant_id.to_owned(), request.clone()));
        Ok(AssistantObject {
            id: assistant_id.to_owned(),
            name: None,
            model: request.model.clone().unwrap_or_default(),
            instructions: request.instructions.clone(),
        })
    }

    async fn create_thread(&self) -> AppResult<ThreadObject> {
        self.record("create_thread");
        let delay = *self.create_thread_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.threads_created.fetch_add(1, Ordering::SeqCst);
        let id = self.fresh_id("thread");
        self.threads.lock().unwrap().insert(id.clone());
        Ok(ThreadObject { id })
    }

    async fn retrieve_thread(&self, thread_id: &str) -> AppResult<ThreadObject> {
        self.record("retrieve_thread");
        if self.threads.lock().unwrap().contains(thread_id) {
            Ok(ThreadObject {
                id: thread_id.to_owned(),
            })
        } else {
            Err(AppError::external_service(
                "fake",
                format!("No thread found with id '{thread_id}'"),
            ))
        }
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> AppResult<ThreadMessage> {
        self.record("create_message");
        self.messages_created.fetch_add(1, Ordering::SeqCst);
        let message = ThreadMessage::new(
            self.fresh_id("msg"),
            role,
            MessageContent::Text(content.to_owned()),
        );
        self.thread_messages
            .lock()
            .unwrap()
            .entry(thread_id.to_owned())
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn create_run(&self, thread_id: &str, _assistant_id: &str) -> AppResult<RunObject> {
        self.record("create_run");
        self.runs_created.fetch_add(1, Ordering::SeqCst);
        let reply = self.assistant_reply.lock().unwrap().clone();
        if let Some(content) = reply {
            self.push_message(thread_id, MessageRole::Assistant, content);
        }
        Ok(RunObject::new(self.fresh_id("run"), RunStatus::Queued))
    }

    async fn retrieve_run(&self, _thread_id: &str, run_id: &str) -> AppResult<RunObject> {
        self.record("retrieve_run");
        self.run_polls.fetch_add(1, Ordering::SeqCst);
        let status = self.next_status();
        if status == RunStatus::Failed {
            return RunObject::from_value(serde_json::json!({
                "id": run_id,
                "status": "failed",
                "last_error": { "code": "server_error", "message": "Sorry, something went wrong." }
            }));
        }
        Ok(RunObject::new(run_id, status))
    }

    async fn list_messages(&self, thread_id: &str) -> AppResult<Vec<ThreadMessage>> {
        self.record("list_messages");
        Ok(self
            .thread_messages
            .lock()
            .unwrap()
            .get(thread_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Failing Store
// ============================================================================

/// Store whose string and/or hash operations report the backend as unavailable
pub struct FailingStore {
    inner: InMemoryStore,
    pub fail_strings: AtomicBool,
    pub fail_hashes: AtomicBool,
}

impl FailingStore {
    pub fn new(fail_strings: bool, fail_hashes: bool) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryStore::new(),
            fail_strings: AtomicBool::new(fail_strings),
            fail_hashes: AtomicBool::new(fail_hashes),
        })
    }

    fn check(flag: &AtomicBool) -> AppResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(AppError::storage("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Self::check(&self.fail_strings)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        Self::check(&self.fail_strings)?;
        self.inner.set(key, value).await
    }

    async fn hget(&self, key: &str, field: &str) -> AppResult<Option<String>> {
        Self::check(&self.fail_hashes)?;
        self.inner.hget(key, field).await
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> AppResult<u64> {
        Self::check(&self.fail_hashes)?;
        self.inner.hset(key, field, value).await
    }

    async fn hset_if_absent(&self, key: &str, field: &str, value: &str) -> AppResult<bool> {
        Self::check(&self.fail_hashes)?;
        self.inner.hset_if_absent(key, field, value).await
    }

    async fn health_check(&self) -> AppResult<()> {
        Self::check(&self.fail_strings)?;
        Self::check(&self.fail_hashes)
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

// ============================================================================
// Setup Helpers
// ============================================================================

/// Registry over a fresh in-memory store and the given provider
pub fn create_test_registry(
    provider: &Arc<FakeAssistantProvider>,
) -> (Arc<AssistantRegistry>, Arc<InMemoryStore>) {
    init_test_logging();
    let store = Arc::new(InMemoryStore::new());
    let registry = AssistantRegistry::new(
        Arc::clone(&store) as Arc<dyn KeyValueStore>,
        Arc::clone(provider) as Arc<dyn AssistantProvider>,
        fast_poll(),
    );
    (Arc::new(registry), store)
}

/// Server resources over the given store and provider with test-friendly config
pub fn create_test_resources(
    store: Arc<dyn KeyValueStore>,
    provider: &Arc<FakeAssistantProvider>,
) -> Arc<ServerResources> {
    create_test_resources_with_config(store, provider, test_server_config())
}

/// Server configuration for route tests: in-memory store and fast polling
pub fn test_server_config() -> ServerConfig {
    ServerConfig {
        store: StoreConfig::memory(),
        run_poll: fast_poll(),
        ..ServerConfig::default()
    }
}

/// Server resources over `store` and the fake provider with an explicit configuration
pub fn create_test_resources_with_config(
    store: Arc<dyn KeyValueStore>,
    provider: &Arc<FakeAssistantProvider>,
    config: ServerConfig,
) -> Arc<ServerResources> {
    init_test_logging();
    Arc::new(ServerResources::new(
        config,
        store,
        Arc::clone(provider) as Arc<dyn AssistantProvider>,
    ))
}
