// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! crawd-coordinator: drives an autonomous AI agent on a livestream.
//!
//! Three external ports glue together around a small core: chat ingestion
//! ([`chat`]), a single-queue agent-turn [`dispatcher`], an [`autonomy`]
//! state machine + batcher + vibe/plan engine, and a [`speech`] turn gate
//! that blocks on an [`overlay`] acknowledgment. The [`state`] module is the
//! single-writer actor that owns all of it; HTTP and WebSocket surfaces live
//! under [`transport`].

pub mod autonomy;
pub mod chat;
pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod overlay;
pub mod speech;
pub mod state;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::chat::ChatMultiplexer;
use crate::config::{CoordinatorConfig, GatewayTransport};
use crate::gateway::oneshot::OneshotGateway;
use crate::gateway::persistent::{ClientIdentity, PersistentGateway};
use crate::gateway::TriggerAgent;
use crate::transport::build_router;

/// Initialize tracing from config. Uses `try_init` so it's safe to call more
/// than once (e.g. from tests that also run `main`'s setup indirectly).
pub fn init_tracing(config: &CoordinatorConfig) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

/// Run the coordinator until shutdown.
pub async fn run(config: CoordinatorConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let identity = ClientIdentity {
        id: config.gateway_client_id.clone(),
        version: config.gateway_client_version.clone(),
    };
    // Persistent connections additionally carry the inbound tool-invoke
    // port; keep the concrete handle around to spawn that bridge once the
    // coordinator itself is up.
    let persistent_gateway = if config.gateway_transport == GatewayTransport::Persistent {
        Some(PersistentGateway::connect(
            config.gateway_url.clone(),
            config.gateway_auth_token.clone(),
            identity.clone(),
            config.gateway_session_key.clone(),
        ))
    } else {
        None
    };
    let gateway: Arc<dyn TriggerAgent> = if let Some(persistent) = &persistent_gateway {
        Arc::clone(persistent) as Arc<dyn TriggerAgent>
    } else {
        Arc::new(OneshotGateway::new(
            config.gateway_url.clone(),
            config.gateway_auth_token.clone(),
            identity,
            config.gateway_session_key.clone(),
            config.gateway_timeout(),
        ))
    };

    // No concrete platform adapters ship in this core: pumpfun/youtube/
    // twitch/twitter connectors are external collaborators. Production
    // deployments register their own via `ChatMultiplexer::register_adapter`
    // before calling `state::spawn`; `/mock/chat` and `crawd:mock-chat` are
    // the ingestion paths exercised here.
    let multiplexer = Arc::new(ChatMultiplexer::new());

    let handle = state::spawn(config, gateway, multiplexer, shutdown.clone());

    if let Some(persistent) = persistent_gateway {
        gateway::tool_bridge::spawn(persistent, handle.clone());
    }

    tracing::info!("crawd coordinator listening on {addr}");
    let router = build_router(handle);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}
