// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp inbound webhook for the chatkeep backend.
//!
//! Receives Evolution API events over HTTP and feeds user text into the
//! debounce coordinator.

pub mod handlers;
pub mod server;
pub mod webhook;

pub use server::{ServerConfig, WebhookState, router, start_server};
pub use webhook::{EvolutionEvent, IgnoreReason, InboundText};
