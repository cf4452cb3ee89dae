// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Point-in-time operational snapshots.
//!
//! The aggregator composes a [`MonitorSnapshot`] from the task store, the
//! audit ledger, the settings table, and a [`LoadSampler`]. It is read-only
//! and side-effect free; callers may invoke it concurrently and arbitrarily
//! often.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use cipherplane_core::{AuditLogType, CipherplaneError, TaskStatus};
use cipherplane_storage::queries::{audit, settings, tasks};
use cipherplane_storage::{AuditFilter, Database};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::load::{LoadSampler, SystemLoad};

/// How many ledger errors a snapshot carries.
const RECENT_ERROR_LIMIT: i64 = 10;

/// Keys flagged `expires_soon` inside this window before `valid_until`.
const KEY_EXPIRY_WARNING_DAYS: i64 = 30;

/// Everything the monitor endpoint returns. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub service: ServiceStatus,
    pub key: KeyStatus,
    pub load: SystemLoad,
    pub recent_errors: Vec<RecentError>,
}

/// Uptime and cumulative throughput counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub service_start_time: DateTime<Utc>,
    pub uptime_seconds: i64,
    /// Count of tasks currently `Running`.
    pub current_tasks: i64,
    pub total_encryptions: i64,
    pub total_decryptions: i64,
    /// Count of ledger entries with `status == "error"`.
    pub total_errors: i64,
}

/// Rotation health of the active encryption key, read from settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyStatus {
    pub version: String,
    pub valid_until: DateTime<Utc>,
    pub last_rotation: DateTime<Utc>,
    pub is_expired: bool,
    /// True only for a key that is still valid but inside the warning window.
    pub expires_soon: bool,
}

/// A ledger error reduced to what the dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentError {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: String,
}

/// Composes [`MonitorSnapshot`]s.
///
/// The process start time is captured once at startup and injected here, so
/// uptime stays consistent across every snapshot the process serves.
pub struct MonitorAggregator {
    db: Arc<Database>,
    start_time: DateTime<Utc>,
    sampler: Box<dyn LoadSampler>,
}

impl MonitorAggregator {
    pub fn new(db: Arc<Database>, start_time: DateTime<Utc>, sampler: Box<dyn LoadSampler>) -> Self {
        Self {
            db,
            start_time,
            sampler,
        }
    }

    /// Compose a snapshot of the service as of now.
    pub async fn snapshot(&self) -> Result<MonitorSnapshot, CipherplaneError> {
        let now = Utc::now();

        let current_tasks = tasks::count_tasks_with_status(&self.db, TaskStatus::Running).await?;
        let total_encryptions =
            audit::count_by_log_type(&self.db, AuditLogType::Encryption).await?;
        let total_decryptions =
            audit::count_by_log_type(&self.db, AuditLogType::Decryption).await?;
        let total_errors = audit::count_by_status(&self.db, "error").await?;

        let error_filter = AuditFilter {
            status: Some("error".to_string()),
            ..Default::default()
        };
        let recent_errors = audit::query_entries(&self.db, &error_filter, RECENT_ERROR_LIMIT)
            .await?
            .into_iter()
            .map(|entry| RecentError {
                timestamp: entry.created_at,
                message: entry
                    .error_message
                    .or(entry.operation)
                    .unwrap_or_default(),
                severity: "error".to_string(),
            })
            .collect();

        let key = self.key_status(now).await?;

        Ok(MonitorSnapshot {
            service: ServiceStatus {
                service_start_time: self.start_time,
                uptime_seconds: (now - self.start_time).num_seconds(),
                current_tasks,
                total_encryptions,
                total_decryptions,
                total_errors,
            },
            key,
            load: self.sampler.sample(),
            recent_errors,
        })
    }

    /// Read key facts from settings, falling back per key when a row is
    /// missing or its timestamp does not parse.
    async fn key_status(&self, now: DateTime<Utc>) -> Result<KeyStatus, CipherplaneError> {
        let version = settings::get_setting_value(&self.db, "key_version")
            .await?
            .unwrap_or_else(|| "v1".to_string());

        let valid_until = settings::get_setting_value(&self.db, "key_valid_until")
            .await?
            .filter(|v| !v.is_empty())
            .and_then(|raw| parse_setting_ts("key_valid_until", &raw))
            .unwrap_or_else(|| one_year_after(now));

        let last_rotation = settings::get_setting_value(&self.db, "key_last_rotation")
            .await?
            .filter(|v| !v.is_empty())
            .and_then(|raw| parse_setting_ts("key_last_rotation", &raw))
            .unwrap_or(self.start_time);

        let is_expired = valid_until < now;
        let expires_soon =
            !is_expired && valid_until - now <= Duration::days(KEY_EXPIRY_WARNING_DAYS);

        Ok(KeyStatus {
            version,
            valid_until,
            last_rotation,
            is_expired,
            expires_soon,
        })
    }
}

/// Parse an RFC 3339 timestamp stored as a settings value. A malformed value
/// is reported once per snapshot and treated as missing.
fn parse_setting_ts(key: &str, raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(err) => {
            warn!(key, value = raw, %err, "ignoring unparseable timestamp in settings");
            None
        }
    }
}

/// Same calendar date next year; falls back to 365 days for Feb 29.
fn one_year_after(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_year(now.year() + 1)
        .unwrap_or_else(|| now + Duration::days(365))
}
