// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the chatkeep backend.
//!
//! Provides the checkpoint saver used by the conversation engine and the
//! debounce buffer store, both over partition-key/sort-key tables and a single
//! `tokio-rusqlite` connection thread.

pub mod buffer;
pub mod database;
pub mod keys;
pub mod queries;
pub mod saver;
pub mod schema;
pub mod serializer;

pub use buffer::SqliteBufferStore;
pub use database::Database;
pub use saver::SqliteCheckpointSaver;
pub use schema::CheckpointTables;
pub use serializer::JsonSerializer;
