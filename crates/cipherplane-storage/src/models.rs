// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage-facing model types.
//!
//! The canonical task and ledger records live in `cipherplane-core::types`;
//! this module re-exports them and adds the write-side shapes (new-record
//! payloads, filters, patches) plus the settings row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use cipherplane_core::types::{AuditLogEntry, AuditLogType, MigrationTask, TaskStatus};

/// Payload for creating a migration task. Status always starts at `Pending`;
/// counters start at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub task_id: String,
    pub table_name: String,
    pub field_name: String,
    pub batch_size: i64,
    pub concurrency: i64,
    pub overwrite_plaintext: bool,
    /// Username of the creating operator.
    pub operator_id: String,
}

/// Payload for appending an audit ledger entry.
///
/// `created_at` is assigned at write time when not supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub log_type: AuditLogType,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub field_name: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewAuditEntry {
    /// A minimal entry of the given type with every optional field empty.
    pub fn new(log_type: AuditLogType) -> Self {
        Self {
            log_type,
            username: None,
            ip_address: None,
            table_name: None,
            field_name: None,
            task_id: None,
            operation: None,
            status: None,
            error_message: None,
            details: serde_json::Map::new(),
            created_at: None,
        }
    }
}

/// Filter predicates for task listings. All present predicates are ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub table_name: Option<String>,
}

/// Filter predicates for ledger queries. All present predicates are ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditFilter {
    pub log_type: Option<AuditLogType>,
    pub username: Option<String>,
    pub table_name: Option<String>,
    pub field_name: Option<String>,
    pub task_id: Option<String>,
    /// Outcome filter; used internally by the monitor for `status = "error"`.
    pub status: Option<String>,
}

/// A system settings row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub id: i64,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Sparse patch for an existing setting; only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingPatch {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
