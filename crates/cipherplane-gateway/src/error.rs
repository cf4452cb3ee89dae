// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps domain errors onto HTTP responses.
//!
//! Every failing endpoint returns a JSON body of the shape
//! `{"error": "<message>"}` with a status code derived from the error kind,
//! so clients can branch on the status and log the message verbatim.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cipherplane_core::CipherplaneError;
use serde::{Deserialize, Serialize};

/// Body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Gateway-level error: a rejected request payload or a domain failure
/// bubbled up from core or storage.
#[derive(Debug)]
pub enum ApiError {
    /// Request payload failed validation before reaching the domain layer.
    Validation(String),
    /// Domain, storage, or auth failure.
    Domain(CipherplaneError),
}

impl From<CipherplaneError> for ApiError {
    fn from(err: CipherplaneError) -> Self {
        ApiError::Domain(err)
    }
}

/// Status code for a domain error. Conflict covers both duplicate creation
/// and rejected lifecycle transitions.
fn domain_status(err: &CipherplaneError) -> StatusCode {
    match err {
        CipherplaneError::NotFound { .. } => StatusCode::NOT_FOUND,
        CipherplaneError::AlreadyExists { .. } | CipherplaneError::InvalidTransition { .. } => {
            StatusCode::CONFLICT
        }
        CipherplaneError::UnsupportedAction { .. } | CipherplaneError::UnsupportedFormat { .. } => {
            StatusCode::BAD_REQUEST
        }
        CipherplaneError::Forbidden { .. } => StatusCode::FORBIDDEN,
        CipherplaneError::Unauthenticated => StatusCode::UNAUTHORIZED,
        CipherplaneError::Config(_)
        | CipherplaneError::Storage { .. }
        | CipherplaneError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Domain(err) => {
                let status = domain_status(&err);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "request failed with an internal error");
                }
                (status, err.to_string())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
