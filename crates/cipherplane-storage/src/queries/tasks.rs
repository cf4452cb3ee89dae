// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task store operations.
//!
//! Lifecycle mutations (control actions, progress reports) run the pure
//! transition functions from `cipherplane-core` inside a single transaction
//! on the write thread, so a transition racing a progress report on the same
//! task can never interleave into a half-written status/timestamp pair.

use std::str::FromStr;

use cipherplane_core::lifecycle::{apply_control, apply_progress, ControlAction, ProgressReport};
use cipherplane_core::{CipherplaneError, MigrationTask, TaskStatus};
use rusqlite::{params, OptionalExtension};

use crate::database::{decode_ts_opt, encode_ts, Database};
use crate::models::{NewTask, TaskFilter};

/// Outcome of a transactional read-modify-write on one task.
enum TransitionOutcome {
    Applied(MigrationTask),
    Missing,
    Rejected(CipherplaneError),
}

/// Create a new task in `Pending` state. Fails with `AlreadyExists` if the
/// task_id is taken; the existing record is left untouched.
pub async fn create_task(db: &Database, new: &NewTask) -> Result<MigrationTask, CipherplaneError> {
    let new = new.clone();
    let task_id = new.task_id.clone();
    let created = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM migration_tasks WHERE task_id = ?1)",
                params![new.task_id],
                |row| row.get(0),
            )?;
            if exists {
                tx.commit()?;
                return Ok(None);
            }
            tx.execute(
                "INSERT INTO migration_tasks
                     (task_id, table_name, field_name, batch_size, concurrency,
                      overwrite_plaintext, status, operator_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)",
                params![
                    new.task_id,
                    new.table_name,
                    new.field_name,
                    new.batch_size,
                    new.concurrency,
                    new.overwrite_plaintext,
                    new.operator_id,
                ],
            )?;
            let id = tx.last_insert_rowid();
            let task = tx.query_row(
                "SELECT id, task_id, table_name, field_name, batch_size, concurrency,
                        overwrite_plaintext, status, progress, started_at, finished_at,
                        success_count, failure_count, failure_reason, operator_id
                 FROM migration_tasks WHERE id = ?1",
                params![id],
                row_to_task,
            )?;
            tx.commit()?;
            Ok(Some(task))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    created.ok_or_else(|| CipherplaneError::AlreadyExists {
        resource: "task".into(),
        id: task_id,
    })
}

/// Get a task by its caller-chosen identifier.
pub async fn get_task(
    db: &Database,
    task_id: &str,
) -> Result<Option<MigrationTask>, CipherplaneError> {
    let task_id = task_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_id, table_name, field_name, batch_size, concurrency,
                        overwrite_plaintext, status, progress, started_at, finished_at,
                        success_count, failure_count, failure_reason, operator_id
                 FROM migration_tasks WHERE task_id = ?1",
            )?;
            stmt.query_row(params![task_id], row_to_task).optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List tasks in creation order, ANDing every present filter predicate.
pub async fn list_tasks(
    db: &Database,
    filter: &TaskFilter,
) -> Result<Vec<MigrationTask>, CipherplaneError> {
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut conditions: Vec<String> = Vec::new();
            let mut values: Vec<String> = Vec::new();
            if let Some(status) = filter.status {
                values.push(status.to_string());
                conditions.push(format!("status = ?{}", values.len()));
            }
            if let Some(table_name) = filter.table_name {
                values.push(table_name);
                conditions.push(format!("table_name = ?{}", values.len()));
            }

            let mut sql = String::from(
                "SELECT id, task_id, table_name, field_name, batch_size, concurrency,
                        overwrite_plaintext, status, progress, started_at, finished_at,
                        success_count, failure_count, failure_reason, operator_id
                 FROM migration_tasks",
            );
            if !conditions.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&conditions.join(" AND "));
            }
            sql.push_str(" ORDER BY id ASC");

            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map(rusqlite::params_from_iter(values), row_to_task)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count tasks with the given status. The monitor uses this for the
/// running-task gauge.
pub async fn count_tasks_with_status(
    db: &Database,
    status: TaskStatus,
) -> Result<i64, CipherplaneError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM migration_tasks WHERE status = ?1",
                params![status.to_string()],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a control action (start/pause/resume/cancel) to a task.
///
/// Load, transition, and persist happen in one transaction, so `finished_at`
/// is stamped exactly once even under concurrent terminal transitions.
pub async fn control_task(
    db: &Database,
    task_id: &str,
    action: ControlAction,
) -> Result<MigrationTask, CipherplaneError> {
    let id = task_id.to_string();
    let now = chrono::Utc::now();
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let result = {
                let mut stmt = tx.prepare(
                    "SELECT id, task_id, table_name, field_name, batch_size, concurrency,
                            overwrite_plaintext, status, progress, started_at, finished_at,
                            success_count, failure_count, failure_reason, operator_id
                     FROM migration_tasks WHERE task_id = ?1",
                )?;
                stmt.query_row(params![id], row_to_task).optional()?
            };
            let mut task = match result {
                Some(task) => task,
                None => {
                    tx.commit()?;
                    return Ok(TransitionOutcome::Missing);
                }
            };
            if let Err(err) = apply_control(&mut task, action, now) {
                tx.commit()?;
                return Ok(TransitionOutcome::Rejected(err));
            }
            tx.execute(
                "UPDATE migration_tasks
                 SET status = ?1, started_at = ?2, finished_at = ?3
                 WHERE task_id = ?4",
                params![
                    task.status.to_string(),
                    task.started_at.map(encode_ts),
                    task.finished_at.map(encode_ts),
                    task.task_id,
                ],
            )?;
            tx.commit()?;
            Ok(TransitionOutcome::Applied(task))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    resolve(outcome, task_id)
}

/// Apply a sparse progress report to a task.
///
/// Runs under the same transactional read-modify-write as `control_task`;
/// a report carrying `status` shares the transition logic, so the timing
/// stamps stay centralized.
pub async fn report_progress(
    db: &Database,
    task_id: &str,
    report: &ProgressReport,
) -> Result<MigrationTask, CipherplaneError> {
    let id = task_id.to_string();
    let report = report.clone();
    let now = chrono::Utc::now();
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let result = {
                let mut stmt = tx.prepare(
                    "SELECT id, task_id, table_name, field_name, batch_size, concurrency,
                            overwrite_plaintext, status, progress, started_at, finished_at,
                            success_count, failure_count, failure_reason, operator_id
                     FROM migration_tasks WHERE task_id = ?1",
                )?;
                stmt.query_row(params![id], row_to_task).optional()?
            };
            let mut task = match result {
                Some(task) => task,
                None => {
                    tx.commit()?;
                    return Ok(TransitionOutcome::Missing);
                }
            };
            if let Err(err) = apply_progress(&mut task, &report, now) {
                tx.commit()?;
                return Ok(TransitionOutcome::Rejected(err));
            }
            tx.execute(
                "UPDATE migration_tasks
                 SET status = ?1, progress = ?2, success_count = ?3, failure_count = ?4,
                     failure_reason = ?5, started_at = ?6, finished_at = ?7
                 WHERE task_id = ?8",
                params![
                    task.status.to_string(),
                    task.progress,
                    task.success_count,
                    task.failure_count,
                    task.failure_reason,
                    task.started_at.map(encode_ts),
                    task.finished_at.map(encode_ts),
                    task.task_id,
                ],
            )?;
            tx.commit()?;
            Ok(TransitionOutcome::Applied(task))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    resolve(outcome, task_id)
}

fn resolve(
    outcome: TransitionOutcome,
    task_id: &str,
) -> Result<MigrationTask, CipherplaneError> {
    match outcome {
        TransitionOutcome::Applied(task) => Ok(task),
        TransitionOutcome::Missing => Err(CipherplaneError::NotFound {
            resource: "task".into(),
            id: task_id.to_string(),
        }),
        TransitionOutcome::Rejected(err) => Err(err),
    }
}

/// Convert a rusqlite Row into a MigrationTask.
fn row_to_task(row: &rusqlite::Row) -> Result<MigrationTask, rusqlite::Error> {
    let status_raw: String = row.get(7)?;
    let status = TaskStatus::from_str(&status_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(MigrationTask {
        id: row.get(0)?,
        task_id: row.get(1)?,
        table_name: row.get(2)?,
        field_name: row.get(3)?,
        batch_size: row.get(4)?,
        concurrency: row.get(5)?,
        overwrite_plaintext: row.get(6)?,
        status,
        progress: row.get(8)?,
        started_at: decode_ts_opt(9, row.get(9)?)?,
        finished_at: decode_ts_opt(10, row.get(10)?)?,
        success_count: row.get(11)?,
        failure_count: row.get(12)?,
        failure_reason: row.get(13)?,
        operator_id: row.get(14)?,
    })
}
