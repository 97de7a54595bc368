// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for chatkeep integration tests.
//!
//! Provides mock adapters and a test harness for fast, deterministic tests
//! without external services.
//!
//! # Components
//!
//! - [`MockExecutionService`] - Execution service with sequential handles and scripted cancels
//! - [`RecordingDispatcher`] - Dispatcher that captures coalesced turns
//! - [`TestHarness`] - Full debounce pipeline over a temp SQLite database

pub mod harness;
pub mod mock_execution;
pub mod recording_dispatcher;

pub use harness::TestHarness;
pub use mock_execution::MockExecutionService;
pub use recording_dispatcher::RecordingDispatcher;
