// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Cipherplane control plane.
//!
//! Exposes the role-gated REST API over axum:
//!
//! - migration task creation, listing, and lifecycle control
//! - audit ledger listing, appends, and CSV export
//! - the aggregated monitor snapshot
//! - system settings management
//!
//! Authentication is bearer-token based, resolved against operators declared
//! in configuration. A `/health` probe stays outside the auth boundary.

pub mod auth;
pub mod error;
pub mod export;
pub mod handlers;
pub mod server;

pub use auth::AuthState;
pub use error::{ApiError, ErrorResponse};
pub use server::{GatewayState, ServerConfig, router, start_server};
