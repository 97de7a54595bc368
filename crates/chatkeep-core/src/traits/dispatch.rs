// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hand-off point to the conversation engine.

use async_trait::async_trait;

use crate::error::ChatkeepError;
use crate::types::ConversationTurn;

/// Receives coalesced user text once a buffer has settled.
#[async_trait]
pub trait ConversationDispatcher: Send + Sync + 'static {
    async fn dispatch(&self, turn: &ConversationTurn) -> Result<(), ChatkeepError>;
}
