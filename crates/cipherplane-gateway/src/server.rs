// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Builds the route tree, wires the auth middleware around the API routes,
//! and serves until the shutdown token fires.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{Router, middleware as axum_middleware};
use cipherplane_core::CipherplaneError;
use cipherplane_monitor::MonitorAggregator;
use cipherplane_storage::Database;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthState, auth_middleware};
use crate::handlers;

/// Shared state handed to axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Durable store shared by every handler.
    pub db: Arc<Database>,
    /// Snapshot aggregator behind `/api/monitor/status`.
    pub monitor: Arc<MonitorAggregator>,
    /// Token table for the auth middleware.
    pub auth: AuthState,
}

/// Gateway server configuration. Mirrors `GatewayConfig` from
/// `cipherplane-config` to avoid a dependency on the config crate here.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Builds the full route tree: an unauthenticated health probe merged with
/// the bearer-gated API routes.
pub fn router(state: GatewayState) -> Router {
    let public_routes = Router::new().route("/health", get(handlers::get_health));

    let api_routes = Router::new()
        .route(
            "/api/migration/tasks",
            post(handlers::create_task).get(handlers::list_tasks),
        )
        .route("/api/migration/tasks/{task_id}", get(handlers::get_task))
        .route(
            "/api/migration/tasks/{task_id}/control",
            post(handlers::control_task),
        )
        .route(
            "/api/migration/tasks/{task_id}/progress",
            post(handlers::report_progress),
        )
        .route(
            "/api/logs",
            get(handlers::list_logs).post(handlers::append_log),
        )
        .route("/api/logs/export", get(handlers::export_logs))
        .route("/api/monitor/status", get(handlers::monitor_status))
        .route(
            "/api/settings",
            get(handlers::list_settings).post(handlers::create_setting),
        )
        .route("/api/settings/{key}", put(handlers::update_setting))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds the configured address and serves until `shutdown` fires, then
/// drains in-flight requests.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), CipherplaneError> {
    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|err| {
        CipherplaneError::Internal(format!("failed to bind gateway to {addr}: {err}"))
    })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|err| CipherplaneError::Internal(format!("gateway server error: {err}")))?;

    Ok(())
}
