// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit ledger operations.
//!
//! The ledger is append-only: there is no update or delete here, and nothing
//! else in the workspace touches the `audit_logs` table.

use std::str::FromStr;

use cipherplane_core::{AuditLogEntry, AuditLogType, CipherplaneError};
use rusqlite::params;

use crate::database::{decode_ts, encode_ts, Database};
use crate::models::{AuditFilter, NewAuditEntry};

/// Append an entry to the ledger. `created_at` is assigned at write time
/// when the caller did not supply one.
pub async fn append_entry(
    db: &Database,
    entry: &NewAuditEntry,
) -> Result<AuditLogEntry, CipherplaneError> {
    let entry = entry.clone();
    let details = serde_json::to_string(&entry.details)
        .map_err(|e| CipherplaneError::Internal(format!("serialize audit details: {e}")))?;
    let created_at = encode_ts(entry.created_at.unwrap_or_else(chrono::Utc::now));

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO audit_logs
                     (created_at, log_type, username, ip_address, table_name, field_name,
                      task_id, operation, status, error_message, details)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    created_at,
                    entry.log_type.to_string(),
                    entry.username,
                    entry.ip_address,
                    entry.table_name,
                    entry.field_name,
                    entry.task_id,
                    entry.operation,
                    entry.status,
                    entry.error_message,
                    details,
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                "SELECT id, created_at, log_type, username, ip_address, table_name,
                        field_name, task_id, operation, status, error_message, details
                 FROM audit_logs WHERE id = ?1",
                params![id],
                row_to_entry,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Query the ledger newest-first, ANDing every present filter predicate.
/// `limit` bounds the result; callers clamp it to their ceiling first.
pub async fn query_entries(
    db: &Database,
    filter: &AuditFilter,
    limit: i64,
) -> Result<Vec<AuditLogEntry>, CipherplaneError> {
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut conditions: Vec<String> = Vec::new();
            let mut values: Vec<String> = Vec::new();
            if let Some(log_type) = filter.log_type {
                values.push(log_type.to_string());
                conditions.push(format!("log_type = ?{}", values.len()));
            }
            if let Some(username) = filter.username {
                values.push(username);
                conditions.push(format!("username = ?{}", values.len()));
            }
            if let Some(table_name) = filter.table_name {
                values.push(table_name);
                conditions.push(format!("table_name = ?{}", values.len()));
            }
            if let Some(field_name) = filter.field_name {
                values.push(field_name);
                conditions.push(format!("field_name = ?{}", values.len()));
            }
            if let Some(task_id) = filter.task_id {
                values.push(task_id);
                conditions.push(format!("task_id = ?{}", values.len()));
            }
            if let Some(status) = filter.status {
                values.push(status);
                conditions.push(format!("status = ?{}", values.len()));
            }

            let mut sql = String::from(
                "SELECT id, created_at, log_type, username, ip_address, table_name,
                        field_name, task_id, operation, status, error_message, details
                 FROM audit_logs",
            );
            if !conditions.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&conditions.join(" AND "));
            }
            sql.push_str(&format!(" ORDER BY created_at DESC, id DESC LIMIT {limit}"));

            let mut stmt = conn.prepare(&sql)?;
            let entries = stmt
                .query_map(rusqlite::params_from_iter(values), row_to_entry)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count ledger entries of the given type. Feeds the monitor's cumulative
/// encryption/decryption totals.
pub async fn count_by_log_type(
    db: &Database,
    log_type: AuditLogType,
) -> Result<i64, CipherplaneError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM audit_logs WHERE log_type = ?1",
                params![log_type.to_string()],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count ledger entries with the given outcome status.
pub async fn count_by_status(db: &Database, status: &str) -> Result<i64, CipherplaneError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM audit_logs WHERE status = ?1",
                params![status],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Convert a rusqlite Row into an AuditLogEntry.
fn row_to_entry(row: &rusqlite::Row) -> Result<AuditLogEntry, rusqlite::Error> {
    let created_raw: String = row.get(1)?;
    let log_type_raw: String = row.get(2)?;
    let log_type = AuditLogType::from_str(&log_type_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let details_raw: String = row.get(11)?;
    Ok(AuditLogEntry {
        id: row.get(0)?,
        created_at: decode_ts(1, &created_raw)?,
        log_type,
        username: row.get(3)?,
        ip_address: row.get(4)?,
        table_name: row.get(5)?,
        field_name: row.get(6)?,
        task_id: row.get(7)?,
        operation: row.get(8)?,
        status: row.get(9)?,
        error_message: row.get(10)?,
        details: serde_json::from_str(&details_raw).unwrap_or_default(),
    })
}
