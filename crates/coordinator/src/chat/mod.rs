// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat ingestion: adapter capability set, message model, and the
//! reconnect-supervising multiplexer.

pub mod adapter;
pub mod message;
pub mod multiplexer;

pub use adapter::{AdapterEvent, ChatAdapter};
pub use message::{short_id_from, ChatMessage, Platform, PlatformMeta};
pub use multiplexer::{AdapterStatus, ChatEvent, ChatMultiplexer};
