// ABOUTME: Assistant lifecycle core: registry, sessions and their parameter types
// ABOUTME: Decides whether to create, reuse or update remote assistants and threads per client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Assistant params, records and session state
pub mod params;
/// Per-(client, type) session cache and thread mappings
pub mod registry;
/// Remote identity and run protocol of one assistant
pub mod session;

pub use params::{AssistantParams, AssistantRecord, MessageReply, SessionState};
pub use registry::AssistantRegistry;
pub use session::{latest_assistant_reply, AssistantSession};
