// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Cipherplane control plane.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CipherplaneError;

/// Lifecycle status of a migration task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Whether this status is terminal (no further transitions expected).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// Category of an audit ledger entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditLogType {
    Encryption,
    Decryption,
    Proxy,
    Migration,
    KeyOperation,
}

/// Supported audit export formats.
///
/// Both render the same CSV payload; they differ only in the attachment
/// filename the gateway advertises.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Excel,
}

/// Operator role used for per-operation authorization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Operator,
    Auditor,
}

/// An authenticated operator, resolved by the gateway auth layer and handed
/// to handlers as the identity/role assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorIdentity {
    pub username: String,
    pub role: Role,
}

impl OperatorIdentity {
    /// Fail with `Forbidden` unless this operator holds one of the allowed roles.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), CipherplaneError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(CipherplaneError::Forbidden {
                username: self.username.clone(),
                required: allowed
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" or "),
            })
        }
    }
}

/// A tracked unit of work migrating one table/field pair from plaintext to
/// encrypted storage.
///
/// `task_id` is the caller-chosen identifier and is immutable after creation;
/// `id` is the storage rowid. `started_at` and `finished_at` are stamped only
/// by lifecycle transitions, never by direct edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationTask {
    pub id: i64,
    pub task_id: String,
    pub table_name: String,
    pub field_name: String,
    pub batch_size: i64,
    pub concurrency: i64,
    pub overwrite_plaintext: bool,
    pub status: TaskStatus,
    pub progress: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub success_count: i64,
    pub failure_count: i64,
    pub failure_reason: Option<String>,
    /// Username of the operator that created the task.
    pub operator_id: String,
}

/// Immutable record of a single security-relevant operation.
///
/// Entries are append-only; nothing in the system updates or deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub log_type: AuditLogType,
    pub username: Option<String>,
    pub ip_address: Option<String>,
    pub table_name: Option<String>,
    pub field_name: Option<String>,
    pub task_id: Option<String>,
    pub operation: Option<String>,
    /// Free-form outcome, e.g. "success" or "error".
    pub status: Option<String>,
    pub error_message: Option<String>,
    /// Extension data; string-keyed, order irrelevant.
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
}
