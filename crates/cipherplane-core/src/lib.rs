// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Cipherplane control plane.
//!
//! This crate provides the domain types, error taxonomy, and the migration
//! task lifecycle state machine used throughout the Cipherplane workspace.
//! It performs no I/O; storage and transport live in their own crates.

pub mod error;
pub mod lifecycle;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CipherplaneError;
pub use lifecycle::{apply_control, apply_progress, ControlAction, ProgressReport};
pub use types::{
    AuditLogEntry, AuditLogType, ExportFormat, MigrationTask, OperatorIdentity, Role, TaskStatus,
};
