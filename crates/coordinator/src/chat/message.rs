// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Closed set of chat sources a [`ChatMessage`] can arrive from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Pumpfun,
    Youtube,
    Twitch,
    Twitter,
}

impl Platform {
    /// The agent-facing tag, e.g. `[YOUTUBE]`. `pumpfun` is omitted from
    /// batch headers for historical-default reasons.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Self::Pumpfun => None,
            Self::Youtube => Some("YOUTUBE"),
            Self::Twitch => Some("TWITCH"),
            Self::Twitter => Some("TWITTER"),
        }
    }
}

/// Opaque, platform-specific metadata carried alongside a [`ChatMessage`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_photo_url: Option<String>,
    #[serde(default)]
    pub is_moderator: bool,
    #[serde(default)]
    pub is_member: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superchat_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superchat_color: Option<String>,
}

/// An immutable chat message emitted by an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    /// Six-character handle reused as a reply target in prompts.
    pub short_id: String,
    pub platform: Platform,
    pub username: String,
    pub body: String,
    /// Arrival timestamp, milliseconds since epoch.
    pub arrived_at_ms: u64,
    #[serde(default)]
    pub meta: PlatformMeta,
}

/// Derive a stable six-character short id from a message id.
///
/// Adapters are expected to assign globally unique `id`s; the short id is a
/// deterministic, display-friendly derivative rather than a second source of
/// identity, so the same message always maps to the same short id.
pub fn short_id_from(id: &str) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    id.hash(&mut hasher);
    let digest = hasher.finish();
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut out = [0u8; 6];
    let mut n = digest;
    for slot in out.iter_mut() {
        *slot = ALPHABET[(n % ALPHABET.len() as u64) as usize];
        n /= ALPHABET.len() as u64;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_is_deterministic_and_six_chars() {
        let a = short_id_from("msg-123");
        let b = short_id_from("msg-123");
        assert_eq!(a, b);
        assert_eq!(a.len(), 6);
    }

    #[test]
    fn pumpfun_tag_is_omitted() {
        assert_eq!(Platform::Pumpfun.tag(), None);
        assert_eq!(Platform::Youtube.tag(), Some("YOUTUBE"));
    }
}
