// ABOUTME: Server binary for the assistant hub HTTP service
// ABOUTME: Loads configuration, initializes logging, connects the store and serves the API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Assistant Hub Server Binary
//!
//! Starts the HTTP API that provisions per-client assistants and relays
//! messages to them.

use anyhow::Result;
use assistant_hub::{
    config::environment::ServerConfig,
    llm::{AssistantProvider, OpenAiAssistantsProvider},
    logging,
    server::{self, ServerResources},
    store::factory::create_store,
};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "assistant-hub-server")]
#[command(about = "Assistant Hub - per-client provisioning of remote LLM assistants")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override the store backend (redis or memory)
    #[arg(long)]
    store_backend: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration from environment
    let mut config = ServerConfig::from_env()?;

    if let Some(http_port) = args.http_port {
        config.http.port = http_port;
    }
    if let Some(backend) = args.store_backend.as_deref() {
        config.store.backend = assistant_hub::config::StoreBackend::parse(backend)?;
    }

    logging::init_from_env()?;

    info!("Starting Assistant Hub");
    info!("{}", config.summary());

    let store = create_store(&config.store).await?;
    info!("Store ready: {}", store.backend_name());

    let provider: Arc<dyn AssistantProvider> =
        Arc::new(OpenAiAssistantsProvider::new(config.remote_api.clone())?);
    info!(
        "Remote assistants API: {} ({})",
        config.remote_api.base_url,
        provider.name()
    );

    display_available_endpoints(&config);

    let resources = Arc::new(ServerResources::new(config, store, provider));

    if let Err(e) = server::serve(resources).await {
        error!("Server error: {:#}", e);
        return Err(e);
    }

    Ok(())
}

/// Display all available API endpoints
fn display_available_endpoints(config: &ServerConfig) {
    let host = &config.http.host;
    let port = config.http.port;

    info!("=== Available API Endpoints ===");
    info!("   Provision:  POST http://{host}:{port}/assistants/{{clientId}}/{{assistantType}}");
    info!(
        "   Message:    POST http://{host}:{port}/assistants/{{clientId}}/{{assistantType}}/messages"
    );
    info!("   Health:     GET  http://{host}:{port}/health");
    info!("   Readiness:  GET  http://{host}:{port}/ready");
    info!("=== End of Endpoint List ===");
}
