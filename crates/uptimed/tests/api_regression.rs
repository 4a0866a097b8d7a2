//! API regression tests.
//!
//! Drives the full router in-process: services lifecycle, import/export,
//! inventory scans against a throwaway listing server, settings, and
//! monitoring control.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::routing::get;
use serde_json::{Value, json};
use tower::ServiceExt;

use uptime_adapters::{DiagnosticAdvisor, GeminiGenerator, InventoryClient};
use uptime_api::{ApiState, build_router};
use uptime_state::{ServiceStatus, Settings, StateStore};
use uptime_supervisor::{AppContext, FixedProbe, Supervisor};

fn test_state(inventory: Option<InventoryClient>) -> ApiState {
    let ctx = AppContext::new(Settings::default());
    let generator =
        GeminiGenerator::new("http://127.0.0.1:1", "test", None, Duration::from_secs(1)).unwrap();
    ApiState {
        supervisor: Arc::new(Supervisor::new(ctx, Arc::new(FixedProbe::broken()))),
        store: StateStore::open_in_memory().unwrap(),
        inventory,
        advisor: DiagnosticAdvisor::new(Arc::new(generator)),
    }
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn serve_listing(listing: Value) -> String {
    let router = axum::Router::new().route(
        "/api/services",
        get(move || async move { axum::Json(listing) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/services")
}

#[tokio::test]
async fn services_lifecycle() {
    let router = build_router(test_state(None));

    let resp = router
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/services",
            Some(json!({ "name": "nginx", "description": "web" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let id = json_body(resp).await["data"]["id"].as_str().unwrap().to_string();

    let resp = router
        .clone()
        .oneshot(request("POST", &format!("/api/v1/services/{id}/toggle"), None))
        .await
        .unwrap();
    assert_eq!(json_body(resp).await["data"]["status"], "RUNNING");

    let resp = router
        .clone()
        .oneshot(request("POST", &format!("/api/v1/services/{id}/restart"), None))
        .await
        .unwrap();
    assert_eq!(json_body(resp).await["data"]["status"], "RESTARTING");

    let resp = router
        .clone()
        .oneshot(request("DELETE", &format!("/api/v1/services/{id}"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Removing again is a no-op that still succeeds.
    let resp = router
        .clone()
        .oneshot(request("DELETE", &format!("/api/v1/services/{id}"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
        .clone()
        .oneshot(request("GET", "/api/v1/logs?level=INFO", None))
        .await
        .unwrap();
    let logs = json_body(resp).await;
    let removals = logs["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["message"].as_str().unwrap().starts_with("Service configuration removed"))
        .count();
    assert_eq!(removals, 2);

    let resp = router
        .oneshot(request("GET", "/api/v1/services", None))
        .await
        .unwrap();
    assert_eq!(json_body(resp).await["data"], json!([]));
}

#[tokio::test]
async fn duplicate_name_conflicts() {
    let router = build_router(test_state(None));
    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let resp = router
            .clone()
            .oneshot(request("POST", "/api/v1/services", Some(json!({ "name": "Api" }))))
            .await
            .unwrap();
        assert_eq!(resp.status(), expected);
    }
}

#[tokio::test]
async fn export_then_import_round_trips() {
    let state = test_state(None);
    state
        .ctx()
        .add(uptime_state::ServiceDraft::new("db", "postgres"))
        .await
        .unwrap();
    let router = build_router(state.clone());

    let resp = router
        .clone()
        .oneshot(request("GET", "/api/v1/services/export", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let exported = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let exported = String::from_utf8(exported.to_vec()).unwrap();

    router
        .clone()
        .oneshot(request("DELETE", "/api/v1/services", None))
        .await
        .unwrap();
    assert!(state.ctx().services().await.is_empty());

    let resp = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/services/import")
                .body(Body::from(exported))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["data"]["imported"], 1);
    assert_eq!(state.ctx().services().await[0].name, "db");
}

#[tokio::test]
async fn malformed_import_leaves_registry_untouched() {
    let state = test_state(None);
    state
        .ctx()
        .add(uptime_state::ServiceDraft::new("keep", ""))
        .await
        .unwrap();
    let before = state.ctx().services().await;
    let router = build_router(state.clone());

    for payload in [
        r#"{"id":"x","name":"x"}"#,
        r#"[{"id":"x","name":"x","status":"BOGUS"}]"#,
        "not json",
    ] {
        let resp = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/services/import")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "payload {payload}");
    }
    assert_eq!(state.ctx().services().await, before);
}

#[tokio::test]
async fn scan_merges_external_services_only() {
    let url = serve_listing(json!([
        { "Name": "wuauserv", "DisplayName": "Windows Update",
          "PathName": "C:\\Windows\\system32\\svchost.exe -k netsvcs", "State": "Running" },
        { "Name": "myservice", "DisplayName": "My Service",
          "PathName": "C:\\Apps\\myservice.exe", "State": "Running" },
        { "Name": "backup", "DisplayName": null,
          "PathName": "\"D:\\Tools\\backup.exe\"", "State": "Stopped" }
    ]))
    .await;
    let client = InventoryClient::new(url, Duration::from_secs(5)).unwrap();
    let state = test_state(Some(client));
    state
        .ctx()
        .add(uptime_state::ServiceDraft::new("BACKUP", ""))
        .await
        .unwrap();
    let router = build_router(state.clone());

    let resp = router
        .clone()
        .oneshot(request("POST", "/api/v1/services/scan", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let report = json_body(resp).await;
    assert_eq!(report["data"]["discovered"], 3);
    assert_eq!(report["data"]["filtered"], 1);
    assert_eq!(report["data"]["duplicates"], 1);
    assert_eq!(report["data"]["added"][0]["name"], "myservice");
    assert_eq!(report["data"]["added"][0]["status"], "RUNNING");

    let resp = router
        .clone()
        .oneshot(request(
            "PUT",
            "/api/v1/inventory/include-system",
            Some(json!({ "includeSystem": true })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
        .oneshot(request("GET", "/api/v1/inventory/templates", None))
        .await
        .unwrap();
    let templates = json_body(resp).await;
    assert_eq!(templates["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn unreachable_inventory_is_bad_gateway() {
    let client = InventoryClient::new("http://127.0.0.1:1/api/services", Duration::from_secs(2))
        .unwrap();
    let state = test_state(Some(client));
    let router = build_router(state.clone());

    let resp = router
        .oneshot(request("POST", "/api/v1/services/scan", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("connection error"));
    // Adapter failures never enter the event log.
    assert!(state.ctx().lock().await.log.is_empty());
}

#[tokio::test]
async fn settings_validation_and_update() {
    let state = test_state(None);
    let router = build_router(state.clone());

    let mut settings = serde_json::to_value(Settings::default()).unwrap();
    settings["checkInterval"] = json!(0);
    let resp = router
        .clone()
        .oneshot(request("PUT", "/api/v1/settings", Some(settings.clone())))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    settings["checkInterval"] = json!(15);
    settings["autoRestart"] = json!(false);
    let resp = router
        .clone()
        .oneshot(request("PUT", "/api/v1/settings", Some(settings)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
        .oneshot(request("GET", "/api/v1/settings", None))
        .await
        .unwrap();
    let body = json_body(resp).await;
    assert_eq!(body["data"]["checkInterval"], 15);
    assert_eq!(body["data"]["autoRestart"], false);
    assert_eq!(state.store.load_settings().unwrap().unwrap().check_interval, 15);
}

#[tokio::test]
async fn manual_tick_drives_state_machine() {
    let state = test_state(None);
    let svc = state
        .ctx()
        .add(uptime_state::ServiceDraft::new("flaky", ""))
        .await
        .unwrap();
    state.ctx().toggle(&svc.id).await.unwrap();
    let router = build_router(state.clone());

    let resp = router
        .clone()
        .oneshot(request("POST", "/api/v1/monitoring/tick", None))
        .await
        .unwrap();
    let report = json_body(resp).await;
    assert_eq!(report["data"]["transitions"], 1);
    assert_eq!(report["data"]["events"], 2);
    assert_eq!(state.ctx().services().await[0].status, ServiceStatus::Restarting);

    let resp = router
        .clone()
        .oneshot(request("GET", "/api/v1/summary", None))
        .await
        .unwrap();
    let summary = json_body(resp).await;
    assert_eq!(summary["data"]["issues"], 1);
    assert_eq!(summary["data"]["hasFailures"], false);

    let resp = router
        .oneshot(request("GET", "/api/v1/report", None))
        .await
        .unwrap();
    assert_eq!(json_body(resp).await["data"]["report"], "API Key not configured.");
}

#[tokio::test]
async fn monitoring_start_stop() {
    let router = build_router(test_state(None));

    let resp = router
        .clone()
        .oneshot(request("POST", "/api/v1/monitoring/start", None))
        .await
        .unwrap();
    assert_eq!(json_body(resp).await["data"]["running"], true);

    let resp = router
        .clone()
        .oneshot(request("GET", "/api/v1/monitoring", None))
        .await
        .unwrap();
    assert_eq!(json_body(resp).await["data"]["running"], true);

    let resp = router
        .clone()
        .oneshot(request("POST", "/api/v1/monitoring/stop", None))
        .await
        .unwrap();
    assert_eq!(json_body(resp).await["data"]["changed"], true);

    let resp = router
        .oneshot(request("GET", "/api/v1/logs", None))
        .await
        .unwrap();
    let logs = json_body(resp).await;
    assert_eq!(logs["data"][0]["message"], "Monitoring stopped by user.");
    assert_eq!(logs["data"][1]["message"], "Monitoring started by user.");
}

#[tokio::test]
async fn active_view_persists() {
    let state = test_state(None);
    let router = build_router(state.clone());

    let resp = router
        .clone()
        .oneshot(request("PUT", "/api/v1/view", Some(json!({ "view": "ai-analysis" }))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        state.store.load_active_view().unwrap(),
        uptime_state::ActiveView::AiAnalysis
    );
}
