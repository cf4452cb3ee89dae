// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./cipherplane.toml` >
//! `~/.config/cipherplane/cipherplane.toml` > `/etc/cipherplane/cipherplane.toml`
//! with environment variable overrides via `CIPHERPLANE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CipherplaneConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/cipherplane/cipherplane.toml` (system-wide)
/// 3. `~/.config/cipherplane/cipherplane.toml` (user XDG config)
/// 4. `./cipherplane.toml` (local directory)
/// 5. `CIPHERPLANE_*` environment variables
pub fn load_config() -> Result<CipherplaneConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CipherplaneConfig::default()))
        .merge(Toml::file("/etc/cipherplane/cipherplane.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("cipherplane/cipherplane.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("cipherplane.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<CipherplaneConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CipherplaneConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
///
/// Backs the `--config` CLI flag; the XDG hierarchy is skipped entirely.
pub fn load_config_from_path(path: &Path) -> Result<CipherplaneConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CipherplaneConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `CIPHERPLANE_STORAGE_DATABASE_PATH` must
/// map to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("CIPHERPLANE_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: CIPHERPLANE_SERVICE_LOG_LEVEL -> "service_log_level"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("auth_", "auth.", 1);
        mapped.into()
    })
}
