// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON implementation of the tagged-blob serializer.

use chatkeep_core::types::TypedBlob;
use chatkeep_core::{ChatkeepError, SerializerProtocol};
use serde_json::Value;

/// Tag for serde_json-encoded payloads.
pub const JSON_TAG: &str = "json";

/// Tag for JSON `null`, stored as zero bytes.
pub const NULL_TAG: &str = "null";

/// Encodes values as compact JSON. The stored tag selects the decoder on read.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl SerializerProtocol for JsonSerializer {
    fn dumps_typed(&self, value: &Value) -> Result<TypedBlob, ChatkeepError> {
        if value.is_null() {
            return Ok(TypedBlob {
                type_tag: NULL_TAG.to_string(),
                bytes: Vec::new(),
            });
        }
        let bytes = serde_json::to_vec(value)
            .map_err(|e| ChatkeepError::Internal(format!("failed to encode payload: {e}")))?;
        Ok(TypedBlob {
            type_tag: JSON_TAG.to_string(),
            bytes,
        })
    }

    fn loads_typed(&self, blob: &TypedBlob) -> Result<Value, ChatkeepError> {
        match blob.type_tag.as_str() {
            JSON_TAG => serde_json::from_slice(&blob.bytes).map_err(|e| {
                ChatkeepError::deserialization(format!("invalid json payload: {e}"))
            }),
            NULL_TAG if blob.bytes.is_empty() => Ok(Value::Null),
            NULL_TAG => Err(ChatkeepError::deserialization(
                "null payload carries unexpected bytes",
            )),
            other => Err(ChatkeepError::deserialization(format!(
                "unknown serialization tag `{other}`"
            ))),
        }
    }
}
