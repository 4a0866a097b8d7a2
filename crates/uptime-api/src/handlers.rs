//! REST API handlers.
//!
//! Operator actions go through the shared `AppContext`; preferences go
//! straight to the `StateStore`. Adapter failures map to 502 and are
//! never written to the event log.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use uptime_adapters::{AdapterError, SystemService, plan_scan, templates};
use uptime_state::{
    ActiveView, LogEntryId, LogFilter, LogLevel, ServiceDraft, ServiceSummary, Settings,
};
use uptime_supervisor::ActionError;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

fn action_error(err: ActionError) -> Response {
    let status = match &err {
        ActionError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
        ActionError::DuplicateName(_) => StatusCode::CONFLICT,
        ActionError::EmptyName | ActionError::Import(_) | ActionError::Config(_) => {
            StatusCode::BAD_REQUEST
        }
    };
    error_response(&err.to_string(), status)
}

fn adapter_error(err: AdapterError) -> Response {
    warn!(error = %err, "inventory unavailable");
    error_response(&err.to_string(), StatusCode::BAD_GATEWAY)
}

fn internal_error(err: impl std::fmt::Display) -> Response {
    error!(error = %err, "request failed");
    error_response(&err.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
}

// ── Services ───────────────────────────────────────────────────

/// GET /api/v1/services
pub async fn list_services(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.ctx().services().await)
}

/// POST /api/v1/services
pub async fn add_service(
    State(state): State<ApiState>,
    Json(draft): Json<ServiceDraft>,
) -> impl IntoResponse {
    match state.ctx().add(draft).await {
        Ok(service) => (StatusCode::CREATED, ApiResponse::ok(service)).into_response(),
        Err(e) => action_error(e),
    }
}

/// DELETE /api/v1/services
pub async fn clear_services(State(state): State<ApiState>) -> impl IntoResponse {
    let cleared = state.ctx().clear_all().await;
    ApiResponse::ok(serde_json::json!({ "cleared": cleared }))
}

/// DELETE /api/v1/services/{id}
///
/// Idempotent: removing an unknown id succeeds with `removed: null`.
pub async fn remove_service(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let removed = state.ctx().remove(&id).await;
    ApiResponse::ok(serde_json::json!({ "removed": removed }))
}

/// POST /api/v1/services/{id}/toggle
pub async fn toggle_service(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.ctx().toggle(&id).await {
        Ok(service) => ApiResponse::ok(service).into_response(),
        Err(e) => action_error(e),
    }
}

/// POST /api/v1/services/{id}/restart
pub async fn restart_service(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.ctx().restart(&id).await {
        Ok(service) => ApiResponse::ok(service).into_response(),
        Err(e) => action_error(e),
    }
}

/// GET /api/v1/services/export
pub async fn export_services(State(state): State<ApiState>) -> impl IntoResponse {
    match state.ctx().export().await {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/json"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"services.config.json\"",
                ),
            ],
            body,
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

/// POST /api/v1/services/import
///
/// The body is the raw exported array. Anything else is rejected and
/// the registry is left unchanged.
pub async fn import_services(State(state): State<ApiState>, body: String) -> impl IntoResponse {
    match state.ctx().import_replace(&body).await {
        Ok(imported) => ApiResponse::ok(serde_json::json!({ "imported": imported })).into_response(),
        Err(e) => action_error(e),
    }
}

// ── Inventory ──────────────────────────────────────────────────

/// Outcome of a scan, as reported to the operator.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub discovered: usize,
    pub filtered: usize,
    pub duplicates: usize,
    pub added: Vec<uptime_state::Service>,
}

async fn fetch_inventory(state: &ApiState) -> Result<(Vec<SystemService>, bool), Response> {
    let Some(client) = &state.inventory else {
        return Err(error_response(
            "inventory endpoint not configured",
            StatusCode::SERVICE_UNAVAILABLE,
        ));
    };
    let include_system = state.store.load_show_hidden().map_err(internal_error)?;
    let entries = client.list_system_services().await.map_err(adapter_error)?;
    Ok((entries, include_system))
}

/// POST /api/v1/services/scan
pub async fn scan_inventory(State(state): State<ApiState>) -> impl IntoResponse {
    let (entries, include_system) = match fetch_inventory(&state).await {
        Ok(fetched) => fetched,
        Err(resp) => return resp,
    };
    let plan = plan_scan(entries, include_system);
    let merged = state.ctx().merge_discovered(plan.candidates).await;

    ApiResponse::ok(ScanReport {
        discovered: plan.discovered,
        filtered: plan.filtered,
        duplicates: merged.duplicates,
        added: merged.added,
    })
    .into_response()
}

/// GET /api/v1/inventory/templates
pub async fn inventory_templates(State(state): State<ApiState>) -> impl IntoResponse {
    match fetch_inventory(&state).await {
        Ok((entries, include_system)) => {
            ApiResponse::ok(templates(entries, include_system)).into_response()
        }
        Err(resp) => resp,
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludeSystemBody {
    pub include_system: bool,
}

/// GET /api/v1/inventory/include-system
pub async fn get_include_system(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.load_show_hidden() {
        Ok(include_system) => ApiResponse::ok(IncludeSystemBody { include_system }).into_response(),
        Err(e) => internal_error(e),
    }
}

/// PUT /api/v1/inventory/include-system
pub async fn put_include_system(
    State(state): State<ApiState>,
    Json(body): Json<IncludeSystemBody>,
) -> impl IntoResponse {
    match state.store.save_show_hidden(body.include_system) {
        Ok(()) => ApiResponse::ok(body).into_response(),
        Err(e) => internal_error(e),
    }
}

// ── Overview ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryView {
    #[serde(flatten)]
    pub summary: ServiceSummary,
    pub has_failures: bool,
    pub monitoring: bool,
}

/// GET /api/v1/summary
pub async fn summary(State(state): State<ApiState>) -> impl IntoResponse {
    let (summary, has_failures) = {
        let session = state.ctx().lock().await;
        (session.registry.summary(), session.registry.has_failures())
    };
    ApiResponse::ok(SummaryView {
        summary,
        has_failures,
        monitoring: state.supervisor.is_running().await,
    })
}

// ── Logs ───────────────────────────────────────────────────────

/// Query string for GET /api/v1/logs.
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub level: Option<LogLevel>,
    pub service_id: Option<String>,
    pub q: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/v1/logs
///
/// Newest entries first.
pub async fn query_logs(
    State(state): State<ApiState>,
    Query(query): Query<LogQuery>,
) -> impl IntoResponse {
    let filter = LogFilter {
        level: query.level,
        service_id: query.service_id,
        text: query.q,
    };
    let session = state.ctx().lock().await;
    let mut entries: Vec<_> = session.log.query(&filter).cloned().collect();
    drop(session);

    entries.reverse();
    if let Some(limit) = query.limit {
        entries.truncate(limit);
    }
    ApiResponse::ok(entries)
}

/// POST /api/v1/logs/{id}/analyze
pub async fn analyze_log(
    State(state): State<ApiState>,
    Path(id): Path<LogEntryId>,
) -> impl IntoResponse {
    let (entry, service) = {
        let session = state.ctx().lock().await;
        let Some(entry) = session.log.get(id).cloned() else {
            return error_response("log entry not found", StatusCode::NOT_FOUND);
        };
        let service = entry
            .service_id
            .as_deref()
            .and_then(|sid| session.registry.get(sid))
            .cloned();
        (entry, service)
    };

    if entry.level != LogLevel::Error {
        return error_response(
            "only ERROR entries can be analyzed",
            StatusCode::BAD_REQUEST,
        );
    }

    let analysis = state
        .advisor
        .summarize_failure(&entry, service.as_ref())
        .await;
    ApiResponse::ok(serde_json::json!({ "logId": id, "analysis": analysis })).into_response()
}

/// GET /api/v1/report
pub async fn health_report(State(state): State<ApiState>) -> impl IntoResponse {
    let (services, log) = {
        let session = state.ctx().lock().await;
        (
            session.registry.list().to_vec(),
            session.log.entries().to_vec(),
        )
    };
    let report = state.advisor.health_report(&services, &log).await;
    ApiResponse::ok(serde_json::json!({ "report": report }))
}

// ── Settings & view ────────────────────────────────────────────

/// GET /api/v1/settings
pub async fn get_settings(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.ctx().settings())
}

/// PUT /api/v1/settings
pub async fn put_settings(
    State(state): State<ApiState>,
    Json(settings): Json<Settings>,
) -> impl IntoResponse {
    if let Err(e) = state.ctx().update_settings(settings.clone()) {
        return action_error(e);
    }
    match state.store.save_settings(&settings) {
        Ok(()) => ApiResponse::ok(settings).into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ViewBody {
    pub view: ActiveView,
}

/// GET /api/v1/view
pub async fn get_view(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.load_active_view() {
        Ok(view) => ApiResponse::ok(ViewBody { view }).into_response(),
        Err(e) => internal_error(e),
    }
}

/// PUT /api/v1/view
pub async fn put_view(
    State(state): State<ApiState>,
    Json(body): Json<ViewBody>,
) -> impl IntoResponse {
    match state.store.save_active_view(body.view) {
        Ok(()) => ApiResponse::ok(body).into_response(),
        Err(e) => internal_error(e),
    }
}

// ── Monitoring ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MonitoringStatus {
    pub running: bool,
    /// Whether this request changed the state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
}

/// GET /api/v1/monitoring
pub async fn monitoring_status(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(MonitoringStatus {
        running: state.supervisor.is_running().await,
        changed: None,
    })
}

/// POST /api/v1/monitoring/start
pub async fn start_monitoring(State(state): State<ApiState>) -> impl IntoResponse {
    let changed = state.supervisor.start().await;
    ApiResponse::ok(MonitoringStatus {
        running: true,
        changed: Some(changed),
    })
}

/// POST /api/v1/monitoring/stop
pub async fn stop_monitoring(State(state): State<ApiState>) -> impl IntoResponse {
    let changed = state.supervisor.stop().await;
    ApiResponse::ok(MonitoringStatus {
        running: false,
        changed: Some(changed),
    })
}

/// POST /api/v1/monitoring/tick
pub async fn tick_now(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.supervisor.tick_now().await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use uptime_adapters::{DiagnosticAdvisor, GeminiGenerator};
    use uptime_state::{ServiceStatus, StateStore};
    use uptime_supervisor::{AppContext, FixedProbe, Supervisor};

    fn test_state(probe: FixedProbe) -> ApiState {
        let ctx = AppContext::new(Settings::default());
        let generator = GeminiGenerator::new(
            "http://127.0.0.1:1",
            "test-model",
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        ApiState {
            supervisor: Arc::new(Supervisor::new(ctx, Arc::new(probe))),
            store: StateStore::open_in_memory().unwrap(),
            inventory: None,
            advisor: DiagnosticAdvisor::new(Arc::new(generator)),
        }
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn list_services_empty() {
        let state = test_state(FixedProbe::healthy());
        let resp = list_services(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn add_then_duplicate_conflicts() {
        let state = test_state(FixedProbe::healthy());

        let resp = add_service(State(state.clone()), Json(ServiceDraft::new("nginx", "web")))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = add_service(State(state.clone()), Json(ServiceDraft::new("NGINX", "")))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("already exists"));
    }

    #[tokio::test]
    async fn toggle_unknown_is_not_found() {
        let state = test_state(FixedProbe::healthy());
        let resp = toggle_service(State(state), Path("nope".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn remove_unknown_is_ok() {
        let state = test_state(FixedProbe::healthy());
        let resp = remove_service(State(state), Path("nope".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["data"]["removed"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn import_rejects_single_object() {
        let state = test_state(FixedProbe::healthy());
        state.ctx().add(ServiceDraft::new("keep", "")).await.unwrap();

        let resp = import_services(State(state.clone()), r#"{"id":"a"}"#.to_string())
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.ctx().services().await.len(), 1);
    }

    #[tokio::test]
    async fn scan_without_inventory_is_unavailable() {
        let state = test_state(FixedProbe::healthy());
        let resp = scan_inventory(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected() {
        let state = test_state(FixedProbe::healthy());
        let mut settings = Settings::default();
        settings.check_interval = 61;

        let resp = put_settings(State(state.clone()), Json(settings))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(state.store.load_settings().unwrap().is_none());
    }

    #[tokio::test]
    async fn settings_are_persisted() {
        let state = test_state(FixedProbe::healthy());
        let mut settings = Settings::default();
        settings.max_retries = 5;

        let resp = put_settings(State(state.clone()), Json(settings.clone()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.ctx().settings(), settings);
        assert_eq!(state.store.load_settings().unwrap(), Some(settings));
    }

    #[tokio::test]
    async fn analyze_requires_error_entry() {
        let state = test_state(FixedProbe::healthy());
        state.ctx().add(ServiceDraft::new("web", "")).await.unwrap();

        // Entry 0 is the INFO "New service added" line.
        let resp = analyze_log(State(state.clone()), Path(0)).await.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = analyze_log(State(state), Path(99)).await.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn analyze_without_key_returns_fallback() {
        let state = test_state(FixedProbe::broken());
        let service = state.ctx().add(ServiceDraft::new("web", "")).await.unwrap();
        state.ctx().toggle(&service.id).await.unwrap();
        state.supervisor.tick_now().await;

        let error_id = {
            let session = state.ctx().lock().await;
            session
                .log
                .query(&LogFilter::level(LogLevel::Error))
                .next()
                .unwrap()
                .id
        };
        let resp = analyze_log(State(state), Path(error_id)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await["data"]["analysis"],
            "API Key not configured. Unable to analyze."
        );
    }

    #[tokio::test]
    async fn summary_counts() {
        let state = test_state(FixedProbe::healthy());
        let a = state.ctx().add(ServiceDraft::new("a", "")).await.unwrap();
        state.ctx().add(ServiceDraft::new("b", "")).await.unwrap();
        state.ctx().toggle(&a.id).await.unwrap();

        let body = body_json(summary(State(state)).await.into_response()).await;
        assert_eq!(body["data"]["total"], 2);
        assert_eq!(body["data"]["running"], 1);
        assert_eq!(body["data"]["stopped"], 1);
        assert_eq!(body["data"]["hasFailures"], false);
        assert_eq!(body["data"]["monitoring"], false);
    }

    #[tokio::test]
    async fn logs_filter_and_order() {
        let state = test_state(FixedProbe::healthy());
        let a = state.ctx().add(ServiceDraft::new("alpha", "")).await.unwrap();
        state.ctx().add(ServiceDraft::new("beta", "")).await.unwrap();
        state.ctx().restart(&a.id).await.unwrap();

        let query = LogQuery {
            level: Some(LogLevel::Info),
            ..LogQuery::default()
        };
        let body = body_json(query_logs(State(state.clone()), Query(query)).await.into_response()).await;
        let messages: Vec<_> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["message"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(messages, ["New service added: beta", "New service added: alpha"]);

        let query = LogQuery {
            service_id: Some(a.id.clone()),
            q: Some("RESTART".to_string()),
            ..LogQuery::default()
        };
        let body = body_json(query_logs(State(state), Query(query)).await.into_response()).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["level"], "WARNING");
    }

    #[tokio::test]
    async fn monitoring_start_stop_tick() {
        let state = test_state(FixedProbe::healthy());
        let svc = state.ctx().add(ServiceDraft::new("a", "")).await.unwrap();
        state.ctx().toggle(&svc.id).await.unwrap();

        let body = body_json(start_monitoring(State(state.clone())).await.into_response()).await;
        assert_eq!(body["data"]["changed"], true);
        let body = body_json(start_monitoring(State(state.clone())).await.into_response()).await;
        assert_eq!(body["data"]["changed"], false);

        let body = body_json(tick_now(State(state.clone())).await.into_response()).await;
        assert_eq!(body["data"]["evaluated"], 1);

        let body = body_json(stop_monitoring(State(state.clone())).await.into_response()).await;
        assert_eq!(body["data"]["running"], false);
        assert_eq!(
            state.ctx().services().await[0].status,
            ServiceStatus::Running
        );
    }

    #[tokio::test]
    async fn view_round_trip() {
        let state = test_state(FixedProbe::healthy());
        let resp = put_view(State(state.clone()), Json(ViewBody { view: ActiveView::Logs }))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(get_view(State(state)).await.into_response()).await;
        assert_eq!(body["data"]["view"], "logs");
    }
}
