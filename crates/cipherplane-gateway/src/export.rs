// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CSV rendering for audit ledger exports.

use chrono::SecondsFormat;
use cipherplane_core::{AuditLogEntry, CipherplaneError, ExportFormat};

/// Column order of the export; the header row uses these labels.
const EXPORT_COLUMNS: [&str; 9] = [
    "created_at",
    "username",
    "log_type",
    "table_name",
    "field_name",
    "task_id",
    "operation",
    "status",
    "error_message",
];

/// Renders ledger entries as header-labeled CSV, newest first as queried.
/// Absent optional fields become empty cells; timestamps are RFC 3339 with
/// millisecond precision.
pub fn render_csv(entries: &[AuditLogEntry]) -> Result<String, CipherplaneError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_COLUMNS).map_err(csv_error)?;
    for entry in entries {
        writer
            .write_record([
                entry.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                entry.username.clone().unwrap_or_default(),
                entry.log_type.to_string(),
                entry.table_name.clone().unwrap_or_default(),
                entry.field_name.clone().unwrap_or_default(),
                entry.task_id.clone().unwrap_or_default(),
                entry.operation.clone().unwrap_or_default(),
                entry.status.clone().unwrap_or_default(),
                entry.error_message.clone().unwrap_or_default(),
            ])
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| CipherplaneError::Internal(format!("failed to flush csv export: {err}")))?;
    String::from_utf8(bytes)
        .map_err(|err| CipherplaneError::Internal(format!("csv export is not utf-8: {err}")))
}

fn csv_error(err: csv::Error) -> CipherplaneError {
    CipherplaneError::Internal(format!("failed to write csv export: {err}"))
}

/// Attachment filename advertised for a format. The payload is CSV either
/// way; only the filename differs.
pub fn attachment_filename(format: ExportFormat) -> &'static str {
    match format {
        ExportFormat::Csv => "audit_logs.csv",
        ExportFormat::Excel => "audit_logs.xlsx",
    }
}
