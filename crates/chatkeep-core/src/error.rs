// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the chatkeep backend.

use thiserror::Error;

/// The primary error type used across all chatkeep adapter traits and core operations.
///
/// "Not found" is never an error here: lookups return `Option` so callers
/// branch on absence instead of matching on a variant.
#[derive(Debug, Error)]
pub enum ChatkeepError {
    /// Configuration errors (missing table names, absent list config, invalid identifiers).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection failure, query failure, constraint violation).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `put_writes` was called with a config that carries no checkpoint id.
    #[error("missing checkpoint_id in config")]
    MissingCheckpoint,

    /// A stored payload could not be decoded.
    #[error("deserialization error: {message}")]
    Deserialization { message: String },

    /// The cancelable execution service rejected a start or cancel request.
    #[error("execution service error: {message}")]
    ExecutionService {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The downstream conversation dispatcher failed.
    #[error("dispatch error: {message}")]
    Dispatch {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatkeepError {
    /// Wrap any storage-layer error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ChatkeepError::Storage {
            source: Box::new(err),
        }
    }

    /// Build a deserialization error from anything printable.
    pub fn deserialization(message: impl Into<String>) -> Self {
        ChatkeepError::Deserialization {
            message: message.into(),
        }
    }

    /// Whether the whole invocation can be retried by the caller.
    ///
    /// Store, execution-service and dispatch failures are transient; config and
    /// payload errors will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChatkeepError::Storage { .. }
                | ChatkeepError::ExecutionService { .. }
                | ChatkeepError::Dispatch { .. }
        )
    }
}
