// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System settings key/value operations.
//!
//! The monitor reads key-rotation facts from here; the binary seeds advisory
//! defaults at startup with `ensure_setting`.

use cipherplane_core::CipherplaneError;
use rusqlite::{params, OptionalExtension};

use crate::database::{decode_ts, Database};
use crate::models::{Setting, SettingPatch};

/// Insert a setting only if the key is not already present. Returns whether
/// a row was inserted. Used for startup seeding, so existing values survive
/// restarts.
pub async fn ensure_setting(
    db: &Database,
    key: &str,
    value: &str,
    description: Option<&str>,
) -> Result<bool, CipherplaneError> {
    let key = key.to_string();
    let value = value.to_string();
    let description = description.map(|d| d.to_string());
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO system_settings (key, value, description) VALUES (?1, ?2, ?3)",
                params![key, value, description],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Create a setting, failing with `AlreadyExists` on a duplicate key.
pub async fn create_setting(
    db: &Database,
    key: &str,
    value: &str,
    description: Option<&str>,
) -> Result<Setting, CipherplaneError> {
    let key_owned = key.to_string();
    let value = value.to_string();
    let description = description.map(|d| d.to_string());
    let created = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM system_settings WHERE key = ?1)",
                params![key_owned],
                |row| row.get(0),
            )?;
            if exists {
                tx.commit()?;
                return Ok(None);
            }
            tx.execute(
                "INSERT INTO system_settings (key, value, description) VALUES (?1, ?2, ?3)",
                params![key_owned, value, description],
            )?;
            let id = tx.last_insert_rowid();
            let setting = tx.query_row(
                "SELECT id, key, value, description, updated_at FROM system_settings WHERE id = ?1",
                params![id],
                row_to_setting,
            )?;
            tx.commit()?;
            Ok(Some(setting))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    created.ok_or_else(|| CipherplaneError::AlreadyExists {
        resource: "setting".into(),
        id: key.to_string(),
    })
}

/// Apply a sparse patch to a setting, bumping `updated_at`.
pub async fn update_setting(
    db: &Database,
    key: &str,
    patch: &SettingPatch,
) -> Result<Setting, CipherplaneError> {
    let key_owned = key.to_string();
    let patch = patch.clone();
    let updated = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing = {
                let mut stmt = tx.prepare(
                    "SELECT id, key, value, description, updated_at FROM system_settings WHERE key = ?1",
                )?;
                stmt.query_row(params![key_owned], row_to_setting).optional()?
            };
            let Some(setting) = existing else {
                tx.commit()?;
                return Ok(None);
            };
            let value = patch.value.unwrap_or(setting.value);
            let description = patch.description.or(setting.description);
            tx.execute(
                "UPDATE system_settings
                 SET value = ?1, description = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE key = ?3",
                params![value, description, key_owned],
            )?;
            let refreshed = tx.query_row(
                "SELECT id, key, value, description, updated_at FROM system_settings WHERE key = ?1",
                params![key_owned],
                row_to_setting,
            )?;
            tx.commit()?;
            Ok(Some(refreshed))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    updated.ok_or_else(|| CipherplaneError::NotFound {
        resource: "setting".into(),
        id: key.to_string(),
    })
}

/// Get a setting row by key.
pub async fn get_setting(db: &Database, key: &str) -> Result<Option<Setting>, CipherplaneError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, key, value, description, updated_at FROM system_settings WHERE key = ?1",
            )?;
            stmt.query_row(params![key], row_to_setting).optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get just a setting's value, for callers that only consult it.
pub async fn get_setting_value(
    db: &Database,
    key: &str,
) -> Result<Option<String>, CipherplaneError> {
    Ok(get_setting(db, key).await?.map(|s| s.value))
}

/// List all settings ordered by key.
pub async fn list_settings(db: &Database) -> Result<Vec<Setting>, CipherplaneError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, key, value, description, updated_at FROM system_settings ORDER BY key ASC",
            )?;
            let settings = stmt
                .query_map([], row_to_setting)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(settings)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Convert a rusqlite Row into a Setting.
fn row_to_setting(row: &rusqlite::Row) -> Result<Setting, rusqlite::Error> {
    let updated_raw: String = row.get(4)?;
    Ok(Setting {
        id: row.get(0)?,
        key: row.get(1)?,
        value: row.get(2)?,
        description: row.get(3)?,
        updated_at: decode_ts(4, &updated_raw)?,
    })
}
