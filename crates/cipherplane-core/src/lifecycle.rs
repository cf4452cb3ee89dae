// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Migration task lifecycle state machine.
//!
//! Transitions are pure functions over a task record. The storage layer
//! invokes them inside its single-record transaction, so concurrent control
//! calls and progress reports on the same task serialize cleanly and the
//! timing stamps are applied exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CipherplaneError;
use crate::types::{MigrationTask, TaskStatus};

/// Control verbs accepted by the task control operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    Pause,
    Resume,
    Cancel,
}

/// Sparse progress patch reported by the external execution engine.
///
/// Only fields that are present are applied. Counter values are absolute,
/// not deltas, and are not clamped; the engine is trusted to report them
/// correctly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub progress: Option<i64>,
    #[serde(default)]
    pub success_count: Option<i64>,
    #[serde(default)]
    pub failure_count: Option<i64>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// Apply a control action to a task, stamping timing fields.
///
/// Terminal tasks reject every control action. Among non-terminal states the
/// table is permissive: `start` and `pause` are accepted from any of them
/// (a `start` while already `Running` is an idempotent success that leaves
/// `started_at` untouched), while `resume` requires the task to be exactly
/// `Paused`.
pub fn apply_control(
    task: &mut MigrationTask,
    action: ControlAction,
    now: DateTime<Utc>,
) -> Result<(), CipherplaneError> {
    if task.status.is_terminal() {
        return Err(CipherplaneError::InvalidTransition {
            task_id: task.task_id.clone(),
            reason: format!("cannot {action} a {} task", task.status),
        });
    }
    match action {
        ControlAction::Start => transition(task, TaskStatus::Running, now),
        ControlAction::Pause => transition(task, TaskStatus::Paused, now),
        ControlAction::Resume => {
            if task.status != TaskStatus::Paused {
                return Err(CipherplaneError::InvalidTransition {
                    task_id: task.task_id.clone(),
                    reason: format!("cannot resume a {} task", task.status),
                });
            }
            transition(task, TaskStatus::Running, now);
        }
        ControlAction::Cancel => transition(task, TaskStatus::Cancelled, now),
    }
    Ok(())
}

/// Apply a sparse progress report to a task.
///
/// A report carrying `status` is routed through the same transition logic as
/// control actions, so `started_at`/`finished_at` stamping stays centralized.
/// Terminal tasks accept field-only reports (the engine may flush its final
/// counters after a cancel races its last report) but reject any further
/// status change, leaving the task untouched.
pub fn apply_progress(
    task: &mut MigrationTask,
    report: &ProgressReport,
    now: DateTime<Utc>,
) -> Result<(), CipherplaneError> {
    if let Some(target) = report.status {
        if task.status.is_terminal() {
            return Err(CipherplaneError::InvalidTransition {
                task_id: task.task_id.clone(),
                reason: format!("cannot move a {} task to {target}", task.status),
            });
        }
    }
    if let Some(progress) = report.progress {
        task.progress = progress;
    }
    if let Some(count) = report.success_count {
        task.success_count = count;
    }
    if let Some(count) = report.failure_count {
        task.failure_count = count;
    }
    if let Some(reason) = &report.failure_reason {
        task.failure_reason = Some(reason.clone());
    }
    if let Some(target) = report.status {
        transition(task, target, now);
    }
    Ok(())
}

/// Move a task to `target`, stamping `started_at` and `finished_at` at most once.
fn transition(task: &mut MigrationTask, target: TaskStatus, now: DateTime<Utc>) {
    if target == TaskStatus::Running && task.started_at.is_none() {
        task.started_at = Some(now);
    }
    if target.is_terminal() && task.finished_at.is_none() {
        task.finished_at = Some(now);
    }
    task.status = target;
}
