// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tagged serialization of opaque engine payloads.

use serde_json::Value;

use crate::error::ChatkeepError;
use crate::types::TypedBlob;

/// Converts engine values to tagged byte blobs and back.
///
/// The tag stored next to the bytes selects the decoder on read, so a saver
/// can hold records written by different encoders.
pub trait SerializerProtocol: Send + Sync {
    fn dumps_typed(&self, value: &Value) -> Result<TypedBlob, ChatkeepError>;

    fn loads_typed(&self, blob: &TypedBlob) -> Result<Value, ChatkeepError>;
}
