// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent gateway port and reply classification.
//!
//! `TriggerAgent` is the single outbound RPC: "run one agent turn, get back
//! an ordered list of free-form strings." Modeled as one client behind a
//! narrow trait -- here narrowed to a single method since there's only one
//! RPC shape to call.

pub mod mock;
pub mod oneshot;
pub mod persistent;
pub mod tool_bridge;

use std::fmt;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

/// Result of one agent turn: an ordered list of free-form strings.
pub type AgentReply = Vec<String>;

/// Outbound port to the agent gateway. `persistent` and `oneshot` are two
/// parallel implementations of this same trait, kept side by side rather
/// than unified behind a mode flag.
#[async_trait]
pub trait TriggerAgent: Send + Sync {
    async fn trigger(&self, message: &str) -> Result<AgentReply, GatewayError>;
}

#[derive(Debug, Clone)]
pub enum GatewayError {
    Transport(String),
    Timeout,
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "gateway transport failure: {msg}"),
            Self::Timeout => write!(f, "gateway call exceeded its hard timeout"),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Classification of a single reply string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    ApiError,
    ProtocolAck,
    QuietAck,
    Misaligned,
}

fn api_error_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\d{3}\s+(status code|error)|rate.?limit").expect("valid regex")
    })
}

/// Classify one agent reply string by case-insensitive exact match after
/// trimming, falling back to the API-error regex.
pub fn classify_reply(raw: &str) -> ReplyKind {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("LIVESTREAM_REPLIED") {
        return ReplyKind::ProtocolAck;
    }
    if trimmed.eq_ignore_ascii_case("NO_REPLY") {
        return ReplyKind::QuietAck;
    }
    if api_error_regex().is_match(trimmed) {
        return ReplyKind::ApiError;
    }
    ReplyKind::Misaligned
}

/// Classify an entire reply, returning the kind of each string in order.
pub fn classify_all(reply: &[String]) -> Vec<ReplyKind> {
    reply.iter().map(|s| classify_reply(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_protocol_and_quiet_acks_case_insensitively() {
        assert_eq!(classify_reply(" livestream_replied  "), ReplyKind::ProtocolAck);
        assert_eq!(classify_reply("No_Reply"), ReplyKind::QuietAck);
    }

    #[test]
    fn classifies_api_errors() {
        assert_eq!(classify_reply("429 status code"), ReplyKind::ApiError);
        assert_eq!(classify_reply("500 error: upstream down"), ReplyKind::ApiError);
        assert_eq!(classify_reply("you are being rate-limited"), ReplyKind::ApiError);
    }

    #[test]
    fn classifies_free_text_as_misaligned() {
        assert_eq!(classify_reply("sure thing!"), ReplyKind::Misaligned);
    }
}
