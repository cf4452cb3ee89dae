// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token authentication for the gateway.
//!
//! Operators are declared in configuration; the middleware resolves the
//! presented token to an [`OperatorIdentity`] and stores it in request
//! extensions for per-handler role checks. An empty operator table rejects
//! every request (fail closed).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use cipherplane_core::{CipherplaneError, OperatorIdentity};

use crate::error::ApiError;

/// Token table resolved from `[[auth.operators]]` in the config file.
#[derive(Clone, Default)]
pub struct AuthState {
    operators: Arc<HashMap<String, OperatorIdentity>>,
}

impl AuthState {
    pub fn new(entries: impl IntoIterator<Item = (String, OperatorIdentity)>) -> Self {
        Self {
            operators: Arc::new(entries.into_iter().collect()),
        }
    }

    /// True when no operator tokens are configured.
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    fn resolve(&self, token: &str) -> Option<&OperatorIdentity> {
        self.operators.get(token)
    }
}

// Tokens must not leak into logs or panic output.
impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let operators = format!("{} token(s) [redacted]", self.operators.len());
        f.debug_struct("AuthState")
            .field("operators", &operators)
            .finish()
    }
}

/// Resolves `Authorization: Bearer <token>` to an operator identity and
/// injects it into request extensions. Missing, malformed, and unknown
/// tokens all fail with the same unauthenticated error.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if auth.is_empty() {
        tracing::error!("no operators configured, rejecting all API requests");
        return Err(CipherplaneError::Unauthenticated.into());
    }

    let identity = request
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| auth.resolve(token))
        .cloned();

    match identity {
        Some(identity) => {
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        None => Err(CipherplaneError::Unauthenticated.into()),
    }
}

#[cfg(test)]
mod tests {
    use cipherplane_core::Role;

    use super::*;

    fn operator(username: &str, role: Role) -> OperatorIdentity {
        OperatorIdentity {
            username: username.to_string(),
            role,
        }
    }

    #[test]
    fn known_token_resolves_to_its_operator() {
        let auth = AuthState::new([
            ("alice-token".to_string(), operator("alice", Role::Admin)),
            ("bob-token".to_string(), operator("bob", Role::Operator)),
        ]);

        let identity = auth.resolve("bob-token").unwrap();
        assert_eq!(identity.username, "bob");
        assert_eq!(identity.role, Role::Operator);
        assert!(auth.resolve("eve-token").is_none());
    }

    #[test]
    fn empty_table_is_reported_as_empty() {
        assert!(AuthState::default().is_empty());
        let auth = AuthState::new([("t".to_string(), operator("alice", Role::Auditor))]);
        assert!(!auth.is_empty());
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let auth = AuthState::new([(
            "super-secret-token".to_string(),
            operator("alice", Role::Admin),
        )]);
        let rendered = format!("{auth:?}");
        assert!(!rendered.contains("super-secret-token"));
        assert!(rendered.contains("[redacted]"));
    }
}
