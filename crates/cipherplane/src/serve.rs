// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cipherplane serve` command implementation.
//!
//! Starts the full control plane: opens the SQLite store, seeds default
//! settings, builds the monitor aggregator, and serves the gateway API
//! until a shutdown signal arrives.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, SecondsFormat, Utc};
use cipherplane_config::CipherplaneConfig;
use cipherplane_core::{CipherplaneError, OperatorIdentity};
use cipherplane_gateway::{AuthState, GatewayState, ServerConfig};
use cipherplane_monitor::{MonitorAggregator, SysinfoSampler};
use cipherplane_storage::Database;
use cipherplane_storage::queries::settings;
use tracing::{debug, info};

use crate::shutdown;

/// Runs the `cipherplane serve` command.
///
/// Refuses to start when no operators are configured: the gateway would
/// reject every request, which is never what an operator wants from a
/// freshly started server.
pub async fn run_serve(config: CipherplaneConfig) -> Result<(), CipherplaneError> {
    init_tracing(&config.service.log_level);

    info!("starting cipherplane serve");

    if config.auth.operators.is_empty() {
        eprintln!(
            "error: no operators configured. Add [[auth.operators]] entries \
             to the config file before starting the gateway."
        );
        return Err(CipherplaneError::Config(
            "no operators configured".to_string(),
        ));
    }

    let start_time = Utc::now();

    let db = Arc::new(Database::open(&config.storage.database_path).await?);
    info!(path = config.storage.database_path.as_str(), "database ready");

    let created = seed_default_settings(&db, start_time).await?;
    if created > 0 {
        info!(count = created, "seeded default settings");
    } else {
        debug!("default settings already present");
    }

    let auth = AuthState::new(config.auth.operators.iter().map(|op| {
        (
            op.token.clone(),
            OperatorIdentity {
                username: op.username.clone(),
                role: op.role,
            },
        )
    }));
    info!(operators = config.auth.operators.len(), "auth table loaded");

    let monitor = Arc::new(MonitorAggregator::new(
        db.clone(),
        start_time,
        Box::new(SysinfoSampler::new()),
    ));

    let state = GatewayState {
        db: db.clone(),
        monitor,
        auth,
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };

    let cancel = shutdown::install_signal_handler();
    cipherplane_gateway::start_server(&server_config, state, cancel).await?;

    db.close().await?;
    info!("cipherplane serve shutdown complete");
    Ok(())
}

/// Inserts the default settings rows that the monitor and migration runners
/// expect, without touching keys an operator has already set. Returns how
/// many rows were created.
async fn seed_default_settings(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<usize, CipherplaneError> {
    let valid_until = one_year_from(now).to_rfc3339_opts(SecondsFormat::Millis, true);
    let rotated = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    let defaults: [(&str, &str, &str); 7] = [
        (
            "default_concurrency",
            "4",
            "Default worker concurrency for new tasks",
        ),
        (
            "default_batch_size",
            "500",
            "Default rows per batch for new tasks",
        ),
        (
            "log_retention_days",
            "30",
            "Days to retain audit log entries",
        ),
        (
            "default_algorithm",
            "AES-256-GCM",
            "Default encryption algorithm",
        ),
        ("key_version", "v1", "Active encryption key version"),
        (
            "key_valid_until",
            &valid_until,
            "Expiry timestamp of the active key",
        ),
        (
            "key_last_rotation",
            &rotated,
            "Timestamp of the last key rotation",
        ),
    ];

    let mut created = 0;
    for (key, value, description) in defaults {
        if settings::ensure_setting(db, key, value, Some(description)).await? {
            created += 1;
        }
    }
    Ok(created)
}

/// One calendar year ahead; falls back to 365 days when the date does not
/// exist in the next year (Feb 29).
fn one_year_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_year(now.year() + 1)
        .unwrap_or_else(|| now + Duration::days(365))
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cipherplane={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
