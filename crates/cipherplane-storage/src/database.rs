// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes: the
//! single-record atomicity of task transitions depends on every
//! read-modify-write going through this one connection.

use chrono::{DateTime, Utc};
use tracing::debug;

use cipherplane_core::CipherplaneError;

use crate::migrations;

/// Timestamp format stored in TEXT columns (ISO 8601, millisecond precision).
const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Convert a tokio-rusqlite error into CipherplaneError::Storage.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CipherplaneError {
    CipherplaneError::Storage {
        source: Box::new(e),
    }
}

/// Encode a timestamp for storage in a TEXT column.
pub fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// Decode a stored timestamp, reporting malformed text at column `idx` as a
/// conversion failure.
pub fn decode_ts(idx: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Decode a nullable stored timestamp.
pub fn decode_ts_opt(
    idx: usize,
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    raw.map(|s| decode_ts(idx, &s)).transpose()
}

/// Handle to the WAL-mode SQLite database shared by every Cipherplane store.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply PRAGMAs, and
    /// run any pending migrations.
    pub async fn open(path: &str) -> Result<Self, CipherplaneError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| CipherplaneError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| migrations::run_migrations(conn))
            .await
            .map_err(|e| CipherplaneError::Storage {
                source: Box::new(e),
            })?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// The shared tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL. Called before process exit so the main database
    /// file is self-contained.
    pub async fn close(&self) -> Result<(), CipherplaneError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
