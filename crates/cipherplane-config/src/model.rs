// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Cipherplane control plane.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use cipherplane_core::types::Role;
use serde::{Deserialize, Serialize};

/// Top-level Cipherplane configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CipherplaneConfig {
    /// Service-wide behavior settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP gateway bind settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Operator authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Service-wide behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP gateway bind configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind the API server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the API server to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("cipherplane").join("cipherplane.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("cipherplane.db"))
        .to_string_lossy()
        .into_owned()
}

/// Operator authentication configuration.
///
/// Each `[[auth.operators]]` entry declares a static bearer token and the
/// role it resolves to. With no operators declared the gateway refuses every
/// request (fail-closed), and `serve` refuses to start.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Declared operator identities.
    #[serde(default)]
    pub operators: Vec<OperatorConfig>,
}

/// A single declared operator identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorConfig {
    /// Operator username, recorded as `operator_id` on created tasks.
    pub username: String,

    /// Bearer token presented in the `Authorization` header.
    pub token: String,

    /// Role the token resolves to: admin, operator, or auditor.
    pub role: Role,
}
