// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Debounce buffer record operations.
//!
//! Every mutation is a single statement keyed on `(instance_name,
//! cellphone_number)`, so concurrent handlers for one conversation only ever
//! race on `last_update`, never on a read-modify-write gap.

use chatkeep_core::ChatkeepError;
use chatkeep_core::types::{BufferRecord, ConversationKey, ExecutionHandle};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

fn record_from(
    key: ConversationKey,
    text: String,
    last_update: i64,
    arn: Option<String>,
) -> BufferRecord {
    BufferRecord {
        key,
        text,
        last_update,
        execution_handle: arn.map(ExecutionHandle),
    }
}

type RawRecord = (String, i64, Option<String>);

fn raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

pub async fn get(
    db: &Database,
    table: &str,
    key: &ConversationKey,
) -> Result<Option<BufferRecord>, ChatkeepError> {
    let sql = format!(
        "SELECT text, last_update, execution_arn FROM {table}
         WHERE instance_name = ?1 AND cellphone_number = ?2"
    );
    let k = key.clone();
    let found = db
        .connection()
        .call(move |conn| {
            conn.query_row(&sql, params![k.instance_id, k.conversant_id], raw)
                .optional()
        })
        .await
        .map_err(map_tr_err)?;
    Ok(found.map(|(text, last_update, arn)| record_from(key.clone(), text, last_update, arn)))
}

/// Create the record, or append `text` to it.
///
/// On append the text is joined with one space and trimmed, `last_update`
/// becomes `max(now, previous + 1)` and the execution handle is cleared.
pub async fn append(
    db: &Database,
    table: &str,
    key: &ConversationKey,
    text: &str,
    now: i64,
) -> Result<BufferRecord, ChatkeepError> {
    let sql = format!(
        "INSERT INTO {table} (instance_name, cellphone_number, text, last_update, execution_arn)
         VALUES (?1, ?2, ?3, ?4, NULL)
         ON CONFLICT (instance_name, cellphone_number) DO UPDATE SET
             text = trim({table}.text || ' ' || excluded.text),
             last_update = max(excluded.last_update, {table}.last_update + 1),
             execution_arn = NULL
         RETURNING text, last_update, execution_arn"
    );
    let k = key.clone();
    let text = text.to_string();
    let (text, last_update, arn) = db
        .connection()
        .call(move |conn| {
            conn.query_row(&sql, params![k.instance_id, k.conversant_id, text, now], raw)
        })
        .await
        .map_err(map_tr_err)?;
    Ok(record_from(key.clone(), text, last_update, arn))
}

/// Store `handle` only while the record still carries `expected_last_update`.
pub async fn record_execution(
    db: &Database,
    table: &str,
    key: &ConversationKey,
    expected_last_update: i64,
    handle: &ExecutionHandle,
) -> Result<bool, ChatkeepError> {
    let sql = format!(
        "UPDATE {table} SET execution_arn = ?4
         WHERE instance_name = ?1 AND cellphone_number = ?2 AND last_update = ?3"
    );
    let k = key.clone();
    let handle = handle.0.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                &sql,
                params![k.instance_id, k.conversant_id, expected_last_update, handle],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed == 1)
}

/// Delete the record if it still carries `expected_last_update`, returning it.
pub async fn take_if_current(
    db: &Database,
    table: &str,
    key: &ConversationKey,
    expected_last_update: i64,
) -> Result<Option<BufferRecord>, ChatkeepError> {
    let sql = format!(
        "DELETE FROM {table}
         WHERE instance_name = ?1 AND cellphone_number = ?2 AND last_update = ?3
         RETURNING text, last_update, execution_arn"
    );
    let k = key.clone();
    let taken = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                &sql,
                params![k.instance_id, k.conversant_id, expected_last_update],
                raw,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    Ok(taken.map(|(text, last_update, arn)| record_from(key.clone(), text, last_update, arn)))
}
