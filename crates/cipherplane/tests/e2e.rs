// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end integration tests for the control-plane API.
//!
//! Each test builds an isolated router over a temp SQLite store with three
//! configured operators (admin, operator, auditor) and drives it with
//! in-process requests. Tests are independent and order-insensitive.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use cipherplane_core::{OperatorIdentity, Role};
use cipherplane_gateway::{AuthState, GatewayState, router};
use cipherplane_monitor::{FixedSampler, MonitorAggregator, SystemLoad};
use cipherplane_storage::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "admin-token";
const OPERATOR_TOKEN: &str = "operator-token";
const AUDITOR_TOKEN: &str = "auditor-token";

struct Harness {
    app: Router,
    _dir: tempfile::TempDir,
}

fn identity(username: &str, role: Role) -> OperatorIdentity {
    OperatorIdentity {
        username: username.to_string(),
        role,
    }
}

impl Harness {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e2e.db");
        let db = Arc::new(Database::open(path.to_str().unwrap()).await.unwrap());
        let monitor = Arc::new(MonitorAggregator::new(
            db.clone(),
            Utc::now(),
            Box::new(FixedSampler(SystemLoad {
                cpu_percent: 10.0,
                memory_percent: 25.0,
                db_connections: 1,
            })),
        ));
        let auth = AuthState::new([
            (ADMIN_TOKEN.to_string(), identity("alice", Role::Admin)),
            (OPERATOR_TOKEN.to_string(), identity("bob", Role::Operator)),
            (AUDITOR_TOKEN.to_string(), identity("carol", Role::Auditor)),
        ]);
        Harness {
            app: router(GatewayState { db, monitor, auth }),
            _dir: dir,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Send a request and decode the JSON response body.
    async fn json(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.send(method, uri, Some(token), body).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

fn task_body(task_id: &str) -> Value {
    json!({
        "task_id": task_id,
        "table_name": "patients",
        "field_name": "ssn",
    })
}

fn control(action: &str) -> Value {
    json!({ "action": action })
}

// ---- Test 1: Task lifecycle from creation to a sealed terminal state ----

#[tokio::test]
async fn test_task_lifecycle_start_progress_cancel() {
    let h = Harness::new().await;

    let (status, task) = h
        .json(
            Method::POST,
            "/api/migration/tasks",
            ADMIN_TOKEN,
            Some(json!({
                "task_id": "mig-patients-ssn",
                "table_name": "patients",
                "field_name": "ssn",
                "batch_size": 500,
                "concurrency": 2,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "pending");
    assert_eq!(task["batch_size"], 500);
    assert_eq!(task["concurrency"], 2);
    assert_eq!(task["operator_id"], "alice");
    assert!(task["started_at"].is_null());

    let (status, task) = h
        .json(
            Method::POST,
            "/api/migration/tasks/mig-patients-ssn/control",
            ADMIN_TOKEN,
            Some(control("start")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "running");
    assert!(task["started_at"].is_string());

    let (status, task) = h
        .json(
            Method::POST,
            "/api/migration/tasks/mig-patients-ssn/progress",
            OPERATOR_TOKEN,
            Some(json!({ "progress": 100, "success_count": 100 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["progress"], 100);
    assert_eq!(task["success_count"], 100);
    assert_eq!(task["status"], "running");

    let (status, task) = h
        .json(
            Method::POST,
            "/api/migration/tasks/mig-patients-ssn/control",
            ADMIN_TOKEN,
            Some(control("cancel")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "cancelled");
    assert!(task["finished_at"].is_string());
    let finished_at = task["finished_at"].clone();

    // A late status report must not resurrect the sealed task.
    let (status, body) = h
        .json(
            Method::POST,
            "/api/migration/tasks/mig-patients-ssn/progress",
            OPERATOR_TOKEN,
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("cannot move a cancelled task"),
        "unexpected error body: {body}"
    );

    let (status, task) = h
        .json(
            Method::GET,
            "/api/migration/tasks/mig-patients-ssn",
            AUDITOR_TOKEN,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "cancelled");
    assert_eq!(task["finished_at"], finished_at);
}

#[tokio::test]
async fn test_terminal_tasks_still_accept_count_corrections() {
    let h = Harness::new().await;
    h.json(
        Method::POST,
        "/api/migration/tasks",
        ADMIN_TOKEN,
        Some(task_body("mig-late-counts")),
    )
    .await;
    h.json(
        Method::POST,
        "/api/migration/tasks/mig-late-counts/control",
        ADMIN_TOKEN,
        Some(control("start")),
    )
    .await;
    h.json(
        Method::POST,
        "/api/migration/tasks/mig-late-counts/control",
        ADMIN_TOKEN,
        Some(control("cancel")),
    )
    .await;

    // Straggler batch results may still be recorded after cancellation.
    let (status, task) = h
        .json(
            Method::POST,
            "/api/migration/tasks/mig-late-counts/progress",
            OPERATOR_TOKEN,
            Some(json!({ "failure_count": 3, "failure_reason": "connection reset" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "cancelled");
    assert_eq!(task["failure_count"], 3);
    assert_eq!(task["failure_reason"], "connection reset");
}

// ---- Test 2: Creation and control validation ----

#[tokio::test]
async fn test_duplicate_task_id_conflicts() {
    let h = Harness::new().await;
    let (status, _) = h
        .json(
            Method::POST,
            "/api/migration/tasks",
            ADMIN_TOKEN,
            Some(task_body("mig-dup")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h
        .json(
            Method::POST,
            "/api/migration/tasks",
            ADMIN_TOKEN,
            Some(task_body("mig-dup")),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_unsupported_control_action_is_rejected() {
    let h = Harness::new().await;
    h.json(
        Method::POST,
        "/api/migration/tasks",
        ADMIN_TOKEN,
        Some(task_body("mig-restart")),
    )
    .await;

    let (status, body) = h
        .json(
            Method::POST,
            "/api/migration/tasks/mig-restart/control",
            ADMIN_TOKEN,
            Some(control("restart")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("restart"));
}

#[tokio::test]
async fn test_resume_requires_a_paused_task() {
    let h = Harness::new().await;
    h.json(
        Method::POST,
        "/api/migration/tasks",
        ADMIN_TOKEN,
        Some(task_body("mig-resume")),
    )
    .await;
    h.json(
        Method::POST,
        "/api/migration/tasks/mig-resume/control",
        ADMIN_TOKEN,
        Some(control("start")),
    )
    .await;

    let (status, _) = h
        .json(
            Method::POST,
            "/api/migration/tasks/mig-resume/control",
            ADMIN_TOKEN,
            Some(control("resume")),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, task) = h
        .json(
            Method::POST,
            "/api/migration/tasks/mig-resume/control",
            ADMIN_TOKEN,
            Some(control("pause")),
        )
        .await;
    assert_eq!(task["status"], "paused");

    let (status, task) = h
        .json(
            Method::POST,
            "/api/migration/tasks/mig-resume/control",
            ADMIN_TOKEN,
            Some(control("resume")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "running");
}

#[tokio::test]
async fn test_short_task_id_fails_validation() {
    let h = Harness::new().await;
    let (status, body) = h
        .json(
            Method::POST,
            "/api/migration/tasks",
            ADMIN_TOKEN,
            Some(task_body("ab")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("task_id"));
}

// ---- Test 3: Task listing filters ----

#[tokio::test]
async fn test_task_filters_by_status_and_table() {
    let h = Harness::new().await;
    for (task_id, table) in [
        ("mig-patients-1", "patients"),
        ("mig-patients-2", "patients"),
        ("mig-billing-1", "billing"),
    ] {
        h.json(
            Method::POST,
            "/api/migration/tasks",
            ADMIN_TOKEN,
            Some(json!({ "task_id": task_id, "table_name": table, "field_name": "ssn" })),
        )
        .await;
    }
    h.json(
        Method::POST,
        "/api/migration/tasks/mig-patients-1/control",
        ADMIN_TOKEN,
        Some(control("start")),
    )
    .await;

    let (_, all) = h
        .json(Method::GET, "/api/migration/tasks", AUDITOR_TOKEN, None)
        .await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, running) = h
        .json(
            Method::GET,
            "/api/migration/tasks?status=running",
            AUDITOR_TOKEN,
            None,
        )
        .await;
    assert_eq!(running.as_array().unwrap().len(), 1);
    assert_eq!(running[0]["task_id"], "mig-patients-1");

    let (_, billing) = h
        .json(
            Method::GET,
            "/api/migration/tasks?table_name=billing",
            AUDITOR_TOKEN,
            None,
        )
        .await;
    assert_eq!(billing.as_array().unwrap().len(), 1);

    let (_, none) = h
        .json(
            Method::GET,
            "/api/migration/tasks?status=running&table_name=billing",
            AUDITOR_TOKEN,
            None,
        )
        .await;
    assert_eq!(none.as_array().unwrap().len(), 0);
}

// ---- Test 4: Ledger appends feed the monitor snapshot ----

#[tokio::test]
async fn test_ledger_totals_feed_the_monitor() {
    let h = Harness::new().await;
    for body in [
        json!({ "log_type": "encryption", "status": "success" }),
        json!({ "log_type": "encryption", "status": "success" }),
        json!({ "log_type": "encryption", "status": "error", "error_message": "boom" }),
        json!({ "log_type": "decryption", "status": "success" }),
    ] {
        let (status, _) = h
            .json(Method::POST, "/api/logs", OPERATOR_TOKEN, Some(body))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, snapshot) = h
        .json(Method::GET, "/api/monitor/status", AUDITOR_TOKEN, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["service"]["total_encryptions"], 3);
    assert_eq!(snapshot["service"]["total_decryptions"], 1);
    assert_eq!(snapshot["service"]["total_errors"], 1);
    assert_eq!(snapshot["service"]["current_tasks"], 0);
    assert_eq!(snapshot["recent_errors"].as_array().unwrap().len(), 1);
    assert_eq!(snapshot["recent_errors"][0]["message"], "boom");
    assert_eq!(snapshot["load"]["cpu_percent"], 10.0);
    // No settings seeded in this harness, so key facts use defaults.
    assert_eq!(snapshot["key"]["version"], "v1");
    assert_eq!(snapshot["key"]["is_expired"], false);
}

#[tokio::test]
async fn test_append_log_stamps_the_operator() {
    let h = Harness::new().await;

    let (_, entry) = h
        .json(
            Method::POST,
            "/api/logs",
            OPERATOR_TOKEN,
            Some(json!({ "log_type": "migration", "operation": "start_task" })),
        )
        .await;
    assert_eq!(entry["username"], "bob");
    assert!(entry["created_at"].is_string());

    let (_, entry) = h
        .json(
            Method::POST,
            "/api/logs",
            OPERATOR_TOKEN,
            Some(json!({ "log_type": "migration", "username": "etl-job" })),
        )
        .await;
    assert_eq!(entry["username"], "etl-job");
}

#[tokio::test]
async fn test_logs_filter_by_type_and_user() {
    let h = Harness::new().await;
    h.json(
        Method::POST,
        "/api/logs",
        OPERATOR_TOKEN,
        Some(json!({ "log_type": "encryption", "table_name": "patients" })),
    )
    .await;
    h.json(
        Method::POST,
        "/api/logs",
        ADMIN_TOKEN,
        Some(json!({ "log_type": "migration" })),
    )
    .await;

    let (_, encryption) = h
        .json(Method::GET, "/api/logs?log_type=encryption", AUDITOR_TOKEN, None)
        .await;
    assert_eq!(encryption.as_array().unwrap().len(), 1);
    assert_eq!(encryption[0]["table_name"], "patients");

    let (_, by_alice) = h
        .json(Method::GET, "/api/logs?user=alice", AUDITOR_TOKEN, None)
        .await;
    assert_eq!(by_alice.as_array().unwrap().len(), 1);
    assert_eq!(by_alice[0]["log_type"], "migration");
}

// ---- Test 5: Ledger export ----

#[tokio::test]
async fn test_log_export_is_a_csv_attachment() {
    let h = Harness::new().await;
    h.json(
        Method::POST,
        "/api/logs",
        OPERATOR_TOKEN,
        Some(json!({ "log_type": "encryption", "status": "success" })),
    )
    .await;

    let response = h
        .send(Method::GET, "/api/logs/export", Some(AUDITOR_TOKEN), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/csv"
    );
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("audit_logs.csv")
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("created_at,username,log_type"));
    assert!(text.contains("encryption"));

    // The excel variant only changes the advertised filename.
    let response = h
        .send(
            Method::GET,
            "/api/logs/export?format=excel",
            Some(AUDITOR_TOKEN),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("audit_logs.xlsx")
    );

    let (status, body) = h
        .json(Method::GET, "/api/logs/export?format=pdf", AUDITOR_TOKEN, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("pdf"));
}

// ---- Test 6: Role enforcement ----

#[tokio::test]
async fn test_auditor_is_read_only() {
    let h = Harness::new().await;

    let (status, _) = h
        .json(Method::GET, "/api/migration/tasks", AUDITOR_TOKEN, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h.json(Method::GET, "/api/logs", AUDITOR_TOKEN, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h
        .json(
            Method::POST,
            "/api/migration/tasks",
            AUDITOR_TOKEN,
            Some(task_body("mig-forbidden")),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("carol"));

    let (status, _) = h
        .json(
            Method::POST,
            "/api/logs",
            AUDITOR_TOKEN,
            Some(json!({ "log_type": "proxy" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Settings are admin/operator territory, including the listing.
    let (status, _) = h.json(Method::GET, "/api/settings", AUDITOR_TOKEN, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_settings_writes_are_admin_only() {
    let h = Harness::new().await;

    let (status, _) = h
        .json(
            Method::POST,
            "/api/settings",
            OPERATOR_TOKEN,
            Some(json!({ "key": "retention_days", "value": "90" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, setting) = h
        .json(
            Method::POST,
            "/api/settings",
            ADMIN_TOKEN,
            Some(json!({ "key": "retention_days", "value": "90" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(setting["key"], "retention_days");
    assert_eq!(setting["value"], "90");
}

// ---- Test 7: Settings lifecycle ----

#[tokio::test]
async fn test_settings_create_update_and_conflicts() {
    let h = Harness::new().await;

    let (status, _) = h
        .json(
            Method::POST,
            "/api/settings",
            ADMIN_TOKEN,
            Some(json!({ "key": "default_algorithm", "value": "AES-256-GCM", "description": "Cipher for new tasks" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h
        .json(
            Method::POST,
            "/api/settings",
            ADMIN_TOKEN,
            Some(json!({ "key": "default_algorithm", "value": "AES-128-GCM" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    let (status, setting) = h
        .json(
            Method::PUT,
            "/api/settings/default_algorithm",
            ADMIN_TOKEN,
            Some(json!({ "value": "ChaCha20-Poly1305" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(setting["value"], "ChaCha20-Poly1305");
    assert_eq!(setting["description"], "Cipher for new tasks");

    let (status, _) = h
        .json(
            Method::PUT,
            "/api/settings/never_created",
            ADMIN_TOKEN,
            Some(json!({ "value": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = h
        .json(
            Method::POST,
            "/api/settings",
            ADMIN_TOKEN,
            Some(json!({ "key": "k", "value": "v" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, listing) = h
        .json(Method::GET, "/api/settings", OPERATOR_TOKEN, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing.as_array().unwrap().len(), 1);
}

// ---- Test 8: Authentication boundary ----

#[tokio::test]
async fn test_unknown_and_missing_tokens_are_rejected() {
    let h = Harness::new().await;

    let response = h
        .send(Method::GET, "/api/migration/tasks", Some("wrong-token"), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = h.send(Method::GET, "/api/logs", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The liveness probe stays open.
    let response = h.send(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}
