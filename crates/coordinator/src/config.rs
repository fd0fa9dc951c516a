// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the crawd coordinator.
#[derive(Debug, Clone, clap::Args)]
pub struct CoordinatorConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "CRAWD_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8900, env = "CRAWD_PORT")]
    pub port: u16,

    /// Leading-edge chat batch window, in milliseconds.
    #[arg(long, default_value_t = 20_000, env = "CRAWD_BATCH_WINDOW_MS")]
    pub batch_window_ms: u64,

    /// Chat messages older than `now - startup_grace_ms` at boot are dropped.
    #[arg(long, default_value_t = 30_000, env = "CRAWD_STARTUP_GRACE_MS")]
    pub startup_grace_ms: u64,

    /// Max entries retained in the short-id lookup index.
    #[arg(long, default_value_t = 200, env = "CRAWD_RECENT_MESSAGES_CAP")]
    pub recent_messages_cap: usize,

    /// Inactivity duration before active -> idle.
    #[arg(long, default_value_t = 180_000, env = "CRAWD_IDLE_AFTER_MS")]
    pub idle_after_ms: u64,

    /// Idle duration before idle -> sleep.
    #[arg(long, default_value_t = 180_000, env = "CRAWD_SLEEP_AFTER_IDLE_MS")]
    pub sleep_after_idle_ms: u64,

    /// Sleep/idle check ticker cadence.
    #[arg(long, default_value_t = 10_000, env = "CRAWD_SLEEP_CHECK_MS")]
    pub sleep_check_ms: u64,

    /// Vibe mode: interval between periodic nudges.
    #[arg(long, default_value_t = 30_000, env = "CRAWD_VIBE_INTERVAL_MS")]
    pub vibe_interval_ms: u64,

    /// Plan mode: delay before a nudge fires after a plan edit.
    #[arg(long, default_value_t = 100, env = "CRAWD_PLAN_NUDGE_DELAY_MS")]
    pub plan_nudge_delay_ms: u64,

    /// Hard timeout for an overlay speech ack.
    #[arg(long, default_value_t = 60_000, env = "CRAWD_ACK_TIMEOUT_MS")]
    pub ack_timeout_ms: u64,

    /// Hard timeout for a one-shot gateway transport call.
    #[arg(long, default_value_t = 120_000, env = "CRAWD_GATEWAY_TIMEOUT_MS")]
    pub gateway_timeout_ms: u64,

    /// WebSocket URL of the agent gateway.
    #[arg(long, default_value = "ws://127.0.0.1:8901/gateway", env = "CRAWD_GATEWAY_URL")]
    pub gateway_url: String,

    /// Gateway transport: `persistent` (one long-lived connection) or
    /// `oneshot` (fresh connection per call).
    #[arg(long, default_value = "persistent", env = "CRAWD_GATEWAY_TRANSPORT")]
    pub gateway_transport: GatewayTransport,

    /// Bearer token presented in the gateway handshake, if any.
    #[arg(long, env = "CRAWD_GATEWAY_AUTH_TOKEN")]
    pub gateway_auth_token: Option<String>,

    /// Session key threaded through every `trigger` call.
    #[arg(long, default_value = "default", env = "CRAWD_GATEWAY_SESSION_KEY")]
    pub gateway_session_key: String,

    /// Client id announced in the gateway handshake.
    #[arg(long, default_value = "crawd-coordinator", env = "CRAWD_GATEWAY_CLIENT_ID")]
    pub gateway_client_id: String,

    /// Client version announced in the gateway handshake.
    #[arg(long, default_value = env!("CARGO_PKG_VERSION"), env = "CRAWD_GATEWAY_CLIENT_VERSION")]
    pub gateway_client_version: String,

    /// Log format (json or text).
    #[arg(long, default_value = "json", env = "CRAWD_LOG_FORMAT")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "CRAWD_LOG_LEVEL")]
    pub log_level: String,
}

/// Which [`crate::gateway::TriggerAgent`] transport to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GatewayTransport {
    Persistent,
    Oneshot,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8900,
            batch_window_ms: 20_000,
            startup_grace_ms: 30_000,
            recent_messages_cap: 200,
            idle_after_ms: 180_000,
            sleep_after_idle_ms: 180_000,
            sleep_check_ms: 10_000,
            vibe_interval_ms: 30_000,
            plan_nudge_delay_ms: 100,
            ack_timeout_ms: 60_000,
            gateway_timeout_ms: 120_000,
            gateway_url: "ws://127.0.0.1:8901/gateway".to_owned(),
            gateway_transport: GatewayTransport::Persistent,
            gateway_auth_token: None,
            gateway_session_key: "default".to_owned(),
            gateway_client_id: "crawd-coordinator".to_owned(),
            gateway_client_version: env!("CARGO_PKG_VERSION").to_owned(),
            log_format: "json".to_owned(),
            log_level: "info".to_owned(),
        }
    }
}

impl CoordinatorConfig {
    pub fn batch_window(&self) -> Duration {
        Duration::from_millis(self.batch_window_ms)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn idle_after(&self) -> Duration {
        Duration::from_millis(self.idle_after_ms)
    }

    pub fn sleep_after_idle(&self) -> Duration {
        Duration::from_millis(self.sleep_after_idle_ms)
    }

    pub fn sleep_check_interval(&self) -> Duration {
        Duration::from_millis(self.sleep_check_ms)
    }

    pub fn vibe_interval(&self) -> Duration {
        Duration::from_millis(self.vibe_interval_ms)
    }

    pub fn plan_nudge_delay(&self) -> Duration {
        Duration::from_millis(self.plan_nudge_delay_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }

    /// Deep-merge a partial config in place. Config is a single owned value,
    /// never module-level state.
    pub fn merge(&mut self, partial: PartialCoordinatorConfig) {
        if let Some(v) = partial.batch_window_ms {
            self.batch_window_ms = v;
        }
        if let Some(v) = partial.startup_grace_ms {
            self.startup_grace_ms = v;
        }
        if let Some(v) = partial.recent_messages_cap {
            self.recent_messages_cap = v;
        }
        if let Some(v) = partial.idle_after_ms {
            self.idle_after_ms = v;
        }
        if let Some(v) = partial.sleep_after_idle_ms {
            self.sleep_after_idle_ms = v;
        }
        if let Some(v) = partial.sleep_check_ms {
            self.sleep_check_ms = v;
        }
        if let Some(v) = partial.vibe_interval_ms {
            self.vibe_interval_ms = v;
        }
        if let Some(v) = partial.plan_nudge_delay_ms {
            self.plan_nudge_delay_ms = v;
        }
        if let Some(v) = partial.ack_timeout_ms {
            self.ack_timeout_ms = v;
        }
        if let Some(v) = partial.gateway_timeout_ms {
            self.gateway_timeout_ms = v;
        }
    }
}

/// All-`Option` mirror of [`CoordinatorConfig`], accepted by
/// `POST /coordinator/config` and merged in with [`CoordinatorConfig::merge`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialCoordinatorConfig {
    #[serde(default)]
    pub batch_window_ms: Option<u64>,
    #[serde(default)]
    pub startup_grace_ms: Option<u64>,
    #[serde(default)]
    pub recent_messages_cap: Option<usize>,
    #[serde(default)]
    pub idle_after_ms: Option<u64>,
    #[serde(default)]
    pub sleep_after_idle_ms: Option<u64>,
    #[serde(default)]
    pub sleep_check_ms: Option<u64>,
    #[serde(default)]
    pub vibe_interval_ms: Option<u64>,
    #[serde(default)]
    pub plan_nudge_delay_ms: Option<u64>,
    #[serde(default)]
    pub ack_timeout_ms: Option<u64>,
    #[serde(default)]
    pub gateway_timeout_ms: Option<u64>,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
