// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Cipherplane control plane.

use thiserror::Error;

/// The primary error type used across all Cipherplane crates.
#[derive(Debug, Error)]
pub enum CipherplaneError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The referenced record does not exist.
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// A record with the same identifier already exists.
    #[error("{resource} already exists: {id}")]
    AlreadyExists { resource: String, id: String },

    /// The task's current status forbids the requested transition.
    #[error("invalid transition for task {task_id}: {reason}")]
    InvalidTransition { task_id: String, reason: String },

    /// The control verb is not one of start/pause/resume/cancel.
    #[error("unsupported action: {action}")]
    UnsupportedAction { action: String },

    /// The export format is not one of the supported formats.
    #[error("unsupported export format: {format}")]
    UnsupportedFormat { format: String },

    /// The authenticated operator's role does not permit the operation.
    #[error("operator {username} lacks required role: {required}")]
    Forbidden { username: String, required: String },

    /// No credentials were presented, or they did not resolve to an operator.
    #[error("authentication required")]
    Unauthenticated,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
