// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, non-empty paths, and
//! well-formed operator declarations.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::CipherplaneConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CipherplaneConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate host is not empty
    if config.gateway.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    }

    // Validate host looks like a valid IP or hostname
    if !config.gateway.host.trim().is_empty() {
        let addr = config.gateway.host.trim();
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!(
                    "gateway.host `{addr}` is not a valid IP address or hostname"
                ),
            });
        }
    }

    // Validate database_path is not empty
    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // Validate operator declarations
    for (i, operator) in config.auth.operators.iter().enumerate() {
        if operator.username.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("auth.operators[{i}].username must not be empty"),
            });
        }
        if operator.token.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("auth.operators[{i}].token must not be empty"),
            });
        }
    }

    // Validate no duplicate operator usernames
    let mut seen_usernames = HashSet::new();
    for operator in &config.auth.operators {
        if !seen_usernames.insert(&operator.username) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "duplicate operator username `{}` in [[auth.operators]] array",
                    operator.username
                ),
            });
        }
    }

    // Validate no duplicate tokens: a shared token would make identity
    // resolution ambiguous
    let mut seen_tokens = HashSet::new();
    for (i, operator) in config.auth.operators.iter().enumerate() {
        if !seen_tokens.insert(&operator.token) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "auth.operators[{i}].token duplicates an earlier operator's token"
                ),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OperatorConfig;
    use cipherplane_core::types::Role;

    fn operator(username: &str, token: &str, role: Role) -> OperatorConfig {
        OperatorConfig {
            username: username.to_string(),
            token: token.to_string(),
            role,
        }
    }

    #[test]
    fn default_config_validates() {
        let config = CipherplaneConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = CipherplaneConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn empty_host_fails_validation() {
        let mut config = CipherplaneConfig::default();
        config.gateway.host = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("gateway.host"))));
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = CipherplaneConfig::default();
        config.gateway.host = "0.0.0.0".to_string();
        config.gateway.port = 9000;
        config.storage.database_path = "/tmp/test.db".to_string();
        config.auth.operators = vec![
            operator("alice", "token-a", Role::Admin),
            operator("bob", "token-b", Role::Auditor),
        ];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_operator_token_fails_validation() {
        let mut config = CipherplaneConfig::default();
        config.auth.operators = vec![operator("alice", "", Role::Admin)];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("operators[0].token"))
        ));
    }

    #[test]
    fn duplicate_operator_usernames_fails_validation() {
        let mut config = CipherplaneConfig::default();
        config.auth.operators = vec![
            operator("alice", "token-a", Role::Admin),
            operator("alice", "token-b", Role::Operator),
        ];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("duplicate operator username"))
        ));
    }

    #[test]
    fn duplicate_operator_tokens_fails_validation() {
        let mut config = CipherplaneConfig::default();
        config.auth.operators = vec![
            operator("alice", "shared", Role::Admin),
            operator("bob", "shared", Role::Operator),
        ];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("duplicates an earlier operator's token"))
        ));
    }

    #[test]
    fn operators_array_deserializes_correctly() {
        let toml_str = r#"
[gateway]
port = 9100

[[auth.operators]]
username = "alice"
token = "alice-token"
role = "admin"

[[auth.operators]]
username = "carol"
token = "carol-token"
role = "auditor"
"#;
        let config: CipherplaneConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.auth.operators.len(), 2);
        assert_eq!(config.auth.operators[0].username, "alice");
        assert_eq!(config.auth.operators[0].role, Role::Admin);
        assert_eq!(config.auth.operators[1].username, "carol");
        assert_eq!(config.auth.operators[1].role, Role::Auditor);
    }

    #[test]
    fn operators_deny_unknown_fields() {
        let toml_str = r#"
[[auth.operators]]
username = "alice"
token = "alice-token"
role = "admin"
unknown_field = "bad"
"#;
        let result = toml::from_str::<CipherplaneConfig>(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let toml_str = r#"
[[auth.operators]]
username = "alice"
token = "alice-token"
role = "superuser"
"#;
        let result = toml::from_str::<CipherplaneConfig>(toml_str);
        assert!(result.is_err());
    }
}
