// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the control-plane API.
//!
//! Every authenticated handler receives the resolved [`OperatorIdentity`]
//! from the auth middleware and checks its role before touching storage.
//! Payload validation happens here; lifecycle and uniqueness rules live in
//! the core and storage crates and surface as domain errors.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use cipherplane_core::lifecycle::{ControlAction, ProgressReport};
use cipherplane_core::{
    AuditLogEntry, AuditLogType, CipherplaneError, ExportFormat, MigrationTask, OperatorIdentity,
    Role, TaskStatus,
};
use cipherplane_monitor::MonitorSnapshot;
use cipherplane_storage::queries::{audit, settings, tasks};
use cipherplane_storage::{AuditFilter, NewAuditEntry, NewTask, Setting, SettingPatch, TaskFilter};

use crate::error::ApiError;
use crate::export;
use crate::server::GatewayState;

/// Every role; gates the read-only endpoints.
const ANY_ROLE: &[Role] = &[Role::Admin, Role::Operator, Role::Auditor];
/// Roles that may create records and drive task transitions.
const ADMIN_OR_OPERATOR: &[Role] = &[Role::Admin, Role::Operator];
/// Settings mutations are admin-only.
const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Interactive log listings return at most this many entries.
const LOGS_LIST_CEILING: i64 = 200;
/// Exports fetch at most this many entries, newest first.
const EXPORT_LIMIT: i64 = 1000;

/// Request body for `POST /api/migration/tasks`.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    /// Caller-chosen identifier, 3 to 50 characters, unique across tasks.
    pub task_id: String,
    /// Table holding the field to migrate.
    pub table_name: String,
    /// Field to encrypt or decrypt.
    pub field_name: String,
    /// Rows processed per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    /// Parallel workers for the runner.
    #[serde(default = "default_concurrency")]
    pub concurrency: i64,
    /// Whether the runner may overwrite plaintext in place.
    #[serde(default)]
    pub overwrite_plaintext: bool,
}

fn default_batch_size() -> i64 {
    1000
}

fn default_concurrency() -> i64 {
    1
}

/// Query filters for `GET /api/migration/tasks`.
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub table_name: Option<String>,
}

/// Request body for `POST /api/migration/tasks/{task_id}/control`.
#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    /// One of `start`, `pause`, `resume`, `cancel`.
    pub action: String,
}

/// Query filters for `GET /api/logs`. `user` filters the username column.
#[derive(Debug, Default, Deserialize)]
pub struct LogListQuery {
    #[serde(default)]
    pub log_type: Option<AuditLogType>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub field_name: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Request body for `POST /api/logs`. The entry timestamp is always
/// server-assigned; `username` defaults to the authenticated operator.
#[derive(Debug, Deserialize)]
pub struct AppendLogRequest {
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
}

/// Query parameters for `GET /api/logs/export`.
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    /// `csv` (default) or `excel`.
    #[serde(default)]
    pub format: Option<String>,
}

/// Request body for `POST /api/settings`.
#[derive(Debug, Deserialize)]
pub struct CreateSettingRequest {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// `GET /health`. Unauthenticated liveness probe.
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

/// `POST /api/migration/tasks`. Creates a pending task.
pub async fn create_task(
    State(state): State<GatewayState>,
    Extension(identity): Extension<OperatorIdentity>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<Json<MigrationTask>, ApiError> {
    identity.require_role(ADMIN_OR_OPERATOR)?;
    validate_create(&body)?;

    let new = NewTask {
        task_id: body.task_id,
        table_name: body.table_name,
        field_name: body.field_name,
        batch_size: body.batch_size,
        concurrency: body.concurrency,
        overwrite_plaintext: body.overwrite_plaintext,
        operator_id: identity.username.clone(),
    };
    let task = tasks::create_task(&state.db, &new).await?;
    info!(
        task_id = %task.task_id,
        table_name = %task.table_name,
        field_name = %task.field_name,
        "migration task created"
    );
    Ok(Json(task))
}

/// `GET /api/migration/tasks`. Lists tasks in creation order.
pub async fn list_tasks(
    State(state): State<GatewayState>,
    Extension(identity): Extension<OperatorIdentity>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<MigrationTask>>, ApiError> {
    identity.require_role(ANY_ROLE)?;
    let filter = TaskFilter {
        status: query.status,
        table_name: query.table_name,
    };
    Ok(Json(tasks::list_tasks(&state.db, &filter).await?))
}

/// `GET /api/migration/tasks/{task_id}`.
pub async fn get_task(
    State(state): State<GatewayState>,
    Extension(identity): Extension<OperatorIdentity>,
    Path(task_id): Path<String>,
) -> Result<Json<MigrationTask>, ApiError> {
    identity.require_role(ANY_ROLE)?;
    let task = tasks::get_task(&state.db, &task_id)
        .await?
        .ok_or(CipherplaneError::NotFound {
            resource: "task".to_string(),
            id: task_id,
        })?;
    Ok(Json(task))
}

/// `POST /api/migration/tasks/{task_id}/control`. Applies a lifecycle
/// action and returns the updated task.
pub async fn control_task(
    State(state): State<GatewayState>,
    Extension(identity): Extension<OperatorIdentity>,
    Path(task_id): Path<String>,
    Json(body): Json<ControlRequest>,
) -> Result<Json<MigrationTask>, ApiError> {
    identity.require_role(ADMIN_OR_OPERATOR)?;
    let action = ControlAction::from_str(&body.action).map_err(|_| {
        CipherplaneError::UnsupportedAction {
            action: body.action.clone(),
        }
    })?;
    let task = tasks::control_task(&state.db, &task_id, action).await?;
    info!(task_id = %task.task_id, %action, status = %task.status, "task control applied");
    Ok(Json(task))
}

/// `POST /api/migration/tasks/{task_id}/progress`. Records runner progress
/// and optionally moves the task status.
pub async fn report_progress(
    State(state): State<GatewayState>,
    Extension(identity): Extension<OperatorIdentity>,
    Path(task_id): Path<String>,
    Json(report): Json<ProgressReport>,
) -> Result<Json<MigrationTask>, ApiError> {
    identity.require_role(ADMIN_OR_OPERATOR)?;
    let task = tasks::report_progress(&state.db, &task_id, &report).await?;
    Ok(Json(task))
}

/// `GET /api/logs`. Lists ledger entries, newest first.
pub async fn list_logs(
    State(state): State<GatewayState>,
    Extension(identity): Extension<OperatorIdentity>,
    Query(query): Query<LogListQuery>,
) -> Result<Json<Vec<AuditLogEntry>>, ApiError> {
    identity.require_role(ANY_ROLE)?;
    let filter = AuditFilter {
        log_type: query.log_type,
        username: query.user,
        table_name: query.table_name,
        field_name: query.field_name,
        task_id: query.task_id,
        status: None,
    };
    let limit = effective_log_limit(query.limit);
    Ok(Json(audit::query_entries(&state.db, &filter, limit).await?))
}

/// `POST /api/logs`. Appends a ledger entry.
pub async fn append_log(
    State(state): State<GatewayState>,
    Extension(identity): Extension<OperatorIdentity>,
    Json(body): Json<AppendLogRequest>,
) -> Result<Json<AuditLogEntry>, ApiError> {
    identity.require_role(ADMIN_OR_OPERATOR)?;
    let entry = NewAuditEntry {
        log_type: body.log_type,
        username: body.username.or_else(|| Some(identity.username.clone())),
        ip_address: body.ip_address,
        table_name: body.table_name,
        field_name: body.field_name,
        task_id: body.task_id,
        operation: body.operation,
        status: body.status,
        error_message: body.error_message,
        details: body.details,
        created_at: None,
    };
    Ok(Json(audit::append_entry(&state.db, &entry).await?))
}

/// `GET /api/logs/export`. Streams the newest entries as a CSV attachment.
pub async fn export_logs(
    State(state): State<GatewayState>,
    Extension(identity): Extension<OperatorIdentity>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    identity.require_role(ANY_ROLE)?;
    let raw = query.format.unwrap_or_else(|| "csv".to_string());
    let format = ExportFormat::from_str(&raw)
        .map_err(|_| CipherplaneError::UnsupportedFormat { format: raw })?;

    let entries = audit::query_entries(&state.db, &AuditFilter::default(), EXPORT_LIMIT).await?;
    let payload = export::render_csv(&entries)?;
    let disposition = format!(
        "attachment; filename={}",
        export::attachment_filename(format)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        payload,
    )
        .into_response())
}

/// `GET /api/monitor/status`. Returns a freshly aggregated snapshot.
pub async fn monitor_status(
    State(state): State<GatewayState>,
    Extension(identity): Extension<OperatorIdentity>,
) -> Result<Json<MonitorSnapshot>, ApiError> {
    identity.require_role(ANY_ROLE)?;
    Ok(Json(state.monitor.snapshot().await?))
}

/// `GET /api/settings`. Lists settings sorted by key.
pub async fn list_settings(
    State(state): State<GatewayState>,
    Extension(identity): Extension<OperatorIdentity>,
) -> Result<Json<Vec<Setting>>, ApiError> {
    identity.require_role(ADMIN_OR_OPERATOR)?;
    Ok(Json(settings::list_settings(&state.db).await?))
}

/// `POST /api/settings`. Creates a setting; duplicate keys conflict.
pub async fn create_setting(
    State(state): State<GatewayState>,
    Extension(identity): Extension<OperatorIdentity>,
    Json(body): Json<CreateSettingRequest>,
) -> Result<Json<Setting>, ApiError> {
    identity.require_role(ADMIN_ONLY)?;
    validate_setting_key(&body.key)?;
    let setting = settings::create_setting(
        &state.db,
        &body.key,
        &body.value,
        body.description.as_deref(),
    )
    .await?;
    info!(key = %setting.key, "setting created");
    Ok(Json(setting))
}

/// `PUT /api/settings/{key}`. Updates value and/or description.
pub async fn update_setting(
    State(state): State<GatewayState>,
    Extension(identity): Extension<OperatorIdentity>,
    Path(key): Path<String>,
    Json(patch): Json<SettingPatch>,
) -> Result<Json<Setting>, ApiError> {
    identity.require_role(ADMIN_ONLY)?;
    Ok(Json(settings::update_setting(&state.db, &key, &patch).await?))
}

fn validate_create(body: &CreateTaskRequest) -> Result<(), ApiError> {
    let id_chars = body.task_id.chars().count();
    if !(3..=50).contains(&id_chars) {
        return Err(ApiError::Validation(
            "task_id must be between 3 and 50 characters".to_string(),
        ));
    }
    if body.batch_size < 1 {
        return Err(ApiError::Validation(
            "batch_size must be at least 1".to_string(),
        ));
    }
    if body.concurrency < 1 {
        return Err(ApiError::Validation(
            "concurrency must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_setting_key(key: &str) -> Result<(), ApiError> {
    if key.chars().count() < 2 {
        return Err(ApiError::Validation(
            "key must be at least 2 characters".to_string(),
        ));
    }
    Ok(())
}

/// Clamps a requested log listing limit to `1..=LOGS_LIST_CEILING`.
fn effective_log_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(LOGS_LIST_CEILING).clamp(1, LOGS_LIST_CEILING)
}
