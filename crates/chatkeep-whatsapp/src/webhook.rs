// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Evolution API webhook payloads.
//!
//! Only user-sent text is buffered: plain conversations and list-menu
//! selections. Everything else (own messages, media, status events) is
//! ignored with a reason.

use serde::Deserialize;
use serde_json::{Map, Value};
use strum::Display;

use chatkeep_core::types::ConversationKey;

/// Top-level webhook body as posted by the Evolution API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvolutionEvent {
    /// Name of the WhatsApp instance that received the message.
    #[serde(default)]
    pub instance: Option<String>,
    /// Event kind, e.g. `messages.upsert`. Informational only.
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub data: Option<EventData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub key: MessageKey,
    /// Message content keyed by content type (`conversation`, `listResponseMessage`, ...).
    #[serde(default)]
    pub message: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageKey {
    /// Chat JID, `{phone}@s.whatsapp.net` for direct chats.
    #[serde(default, rename = "remoteJid")]
    pub remote_jid: Option<String>,
    #[serde(default, rename = "fromMe")]
    pub from_me: bool,
}

/// A user message ready for the debouncer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundText {
    pub key: ConversationKey,
    pub text: String,
}

/// Why a webhook event was not buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum IgnoreReason {
    /// No `data.message` section, e.g. connection or presence events.
    NoMessage,
    /// Sent by the bot's own number.
    FromMe,
    MissingInstance,
    MissingSender,
    /// Media or another content type with no text to buffer.
    UnsupportedContent,
}

impl EvolutionEvent {
    /// Extract the sender and text, or the reason the event is skipped.
    pub fn inbound_text(&self) -> Result<InboundText, IgnoreReason> {
        let data = self.data.as_ref().ok_or(IgnoreReason::NoMessage)?;
        let content = data.message.as_ref().ok_or(IgnoreReason::NoMessage)?;
        if data.key.from_me {
            return Err(IgnoreReason::FromMe);
        }

        let instance = self
            .instance
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(IgnoreReason::MissingInstance)?;
        let conversant = data
            .key
            .remote_jid
            .as_deref()
            .and_then(conversant_id)
            .ok_or(IgnoreReason::MissingSender)?;
        let text = content_text(content).ok_or(IgnoreReason::UnsupportedContent)?;

        Ok(InboundText {
            key: ConversationKey::new(instance, conversant),
            text,
        })
    }
}

/// The part of a JID before `@`.
fn conversant_id(jid: &str) -> Option<&str> {
    let id = jid.split('@').next().unwrap_or_default();
    (!id.is_empty()).then_some(id)
}

fn content_text(content: &Map<String, Value>) -> Option<String> {
    if let Some(text) = content.get("conversation") {
        return text.as_str().map(str::to_string);
    }
    if let Some(list) = content.get("listResponseMessage") {
        let row = list
            .pointer("/singleSelectReply/selectedRowId")
            .and_then(Value::as_str)?;
        return Some(format!("Selected option: {row}"));
    }
    None
}
