// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema migrations, embedded at build time from `migrations/`.

use tracing::debug;

use cipherplane_core::CipherplaneError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Bring the schema up to date. Safe to call on every open; refinery skips
/// migrations already recorded in `refinery_schema_history`.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), CipherplaneError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| CipherplaneError::Storage {
            source: Box::new(e),
        })?;
    let applied = report.applied_migrations().len();
    if applied > 0 {
        debug!(applied, "schema migrations applied");
    }
    Ok(())
}
