// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Storage and execution adapters extend the [`PluginAdapter`] base trait and
//! use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod buffer;
pub mod checkpoint;
pub mod dispatch;
pub mod execution;
pub mod serializer;

pub use adapter::PluginAdapter;
pub use buffer::BufferStore;
pub use checkpoint::{CheckpointSaver, CheckpointStream};
pub use dispatch::ConversationDispatcher;
pub use execution::{ExecutionService, ExecutionTarget};
pub use serializer::SerializerProtocol;
