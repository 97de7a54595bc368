// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message debouncing for the chatkeep backend.
//!
//! Rapid messages from one conversation are buffered and coalesced; each new
//! message cancels the pending execution and starts a fresh one, so only the
//! execution started for the newest buffer state survives its staleness check
//! and reaches the conversation engine.

pub mod commands;
pub mod consumer;
pub mod coordinator;
pub mod dispatch;
pub mod local;

pub use commands::{CommandDispatcher, MaintenanceCommand};
pub use consumer::{ConsumeOutcome, DebounceConsumer};
pub use coordinator::DebounceCoordinator;
pub use dispatch::HttpDispatcher;
pub use local::LocalExecutionService;
