// ABOUTME: Application constants grouped by domain (store keys, run polling, remote API, HTTP)
// ABOUTME: Single source for defaults consumed by configuration and the assistant core
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module

/// Service identity used in logs and health responses
pub mod service_names {
    /// Service name reported by health checks and startup logs
    pub const ASSISTANT_HUB: &str = "assistant-hub";
}

/// Key/value store key layout
pub mod store_keys {
    /// Prefix of the per-client hash mapping assistant type to thread id
    pub const CLIENT_KEY_PREFIX: &str = "cliente:";

    /// Suffix of the per-client thread mapping hash
    pub const ASSISTANTS_SUFFIX: &str = ":assistants";

    /// Suffix of the per-client hash holding the last submitted params
    pub const ASSISTANT_PARAMS_SUFFIX: &str = ":assistant-params";

    /// Hash key holding `assistant type -> thread id` for a client
    #[must_use]
    pub fn client_assistants(client_id: &str) -> String {
        format!("{CLIENT_KEY_PREFIX}{client_id}{ASSISTANTS_SUFFIX}")
    }

    /// Hash key holding `assistant type -> params JSON` for a client
    #[must_use]
    pub fn client_assistant_params(client_id: &str) -> String {
        format!("{CLIENT_KEY_PREFIX}{client_id}{ASSISTANT_PARAMS_SUFFIX}")
    }
}

/// Run polling protocol
pub mod run_polling {
    /// Delay before each run status poll
    pub const POLL_INTERVAL_MS: u64 = 500;

    /// Maximum number of status polls before giving up
    pub const MAX_ATTEMPTS: u32 = 5;
}

/// Remote assistants API
pub mod remote_api {
    /// Default base URL of the assistants API
    pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

    /// Beta header required by the assistants endpoints
    pub const BETA_HEADER_NAME: &str = "OpenAI-Beta";

    /// Value of the beta header
    pub const BETA_HEADER_VALUE: &str = "assistants=v2";

    /// Connection timeout
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Per-request timeout
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    /// Page size used when listing thread messages
    pub const MESSAGE_LIST_LIMIT: u32 = 100;
}

/// Redis connection defaults
pub mod redis {
    /// Default Redis host
    pub const DEFAULT_HOST: &str = "localhost";

    /// Default Redis port
    pub const DEFAULT_PORT: u16 = 6379;

    /// Connection timeout in seconds
    pub const CONNECTION_TIMEOUT_SECS: u64 = 5;

    /// Response timeout in seconds
    pub const RESPONSE_TIMEOUT_SECS: u64 = 3;

    /// Reconnection retries after a dropped connection
    pub const RECONNECTION_RETRIES: usize = 5;

    /// Exponential backoff base
    pub const RETRY_EXPONENT_BASE: u64 = 2;

    /// Maximum delay between retries (2s, same cap as the reconnect strategy)
    pub const MAX_RETRY_DELAY_MS: u64 = 2_000;

    /// Retries for the initial connection at startup
    pub const INITIAL_CONNECTION_RETRIES: u32 = 3;

    /// Initial retry delay, doubled on every attempt
    pub const INITIAL_RETRY_DELAY_MS: u64 = 50;
}

/// HTTP server defaults
pub mod http {
    /// Default listen port
    pub const DEFAULT_PORT: u16 = 3000;

    /// Default listen address
    pub const DEFAULT_HOST: &str = "0.0.0.0";

    /// Default request timeout, covers the full run polling window
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

    /// Default maximum request body size
    pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

    /// Request ID header name
    pub const REQUEST_ID_HEADER: &str = "x-request-id";
}

/// Per-IP request rate limiting
pub mod rate_limit {
    /// Requests allowed per window and IP
    pub const DEFAULT_MAX_REQUESTS: u32 = 100;

    /// Window length, 15 minutes
    pub const DEFAULT_WINDOW_SECS: u64 = 15 * 60;

    /// Tracked IP count above which expired windows are swept
    pub const CLEANUP_THRESHOLD: usize = 10_000;

    /// Limit header name
    pub const LIMIT_HEADER: &str = "x-ratelimit-limit";

    /// Remaining-requests header name
    pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
}
