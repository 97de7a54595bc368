// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the chatkeep chatbot backend.
//!
//! This crate provides the trait definitions, error type, and common types
//! shared by the checkpoint saver, the debounce buffer store, and the
//! cancelable execution service.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ChatkeepError;
pub use types::{AdapterType, HealthStatus};

pub use traits::{
    BufferStore, CheckpointSaver, CheckpointStream, ConversationDispatcher, ExecutionService,
    ExecutionTarget, PluginAdapter, SerializerProtocol,
};
