//! uptime-api — REST API for UptimeShield.
//!
//! Exposes every operator action, the registry and log queries, the
//! settings, and monitoring control as JSON endpoints. Responses use a
//! `{ success, data?, error? }` envelope; the export endpoint returns
//! the raw JSON array so it can be saved as a file.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/services` | List services |
//! | POST | `/api/v1/services` | Add a service |
//! | DELETE | `/api/v1/services` | Remove every service |
//! | DELETE | `/api/v1/services/{id}` | Remove a service |
//! | POST | `/api/v1/services/{id}/toggle` | Toggle running/paused |
//! | POST | `/api/v1/services/{id}/restart` | Manual restart |
//! | GET | `/api/v1/services/export` | Export as a JSON array |
//! | POST | `/api/v1/services/import` | Replace from a JSON array |
//! | POST | `/api/v1/services/scan` | Merge the host inventory |
//! | GET | `/api/v1/inventory/templates` | Filtered host inventory |
//! | GET/PUT | `/api/v1/inventory/include-system` | Protected-path override |
//! | GET | `/api/v1/summary` | Overview statistics |
//! | GET | `/api/v1/logs` | Query the event log |
//! | POST | `/api/v1/logs/{id}/analyze` | AI analysis of an ERROR entry |
//! | GET | `/api/v1/report` | AI health report |
//! | GET/PUT | `/api/v1/settings` | Read / replace settings |
//! | GET/PUT | `/api/v1/view` | Active view selection |
//! | GET | `/api/v1/monitoring` | Whether the tick loop is running |
//! | POST | `/api/v1/monitoring/start` | Start monitoring |
//! | POST | `/api/v1/monitoring/stop` | Stop monitoring |
//! | POST | `/api/v1/monitoring/tick` | Run one tick now |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};

use uptime_adapters::{DiagnosticAdvisor, InventoryClient};
use uptime_state::StateStore;
use uptime_supervisor::{AppContext, Supervisor};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub supervisor: Arc<Supervisor>,
    pub store: StateStore,
    /// Absent when no inventory endpoint is configured.
    pub inventory: Option<InventoryClient>,
    pub advisor: DiagnosticAdvisor,
}

impl ApiState {
    pub fn ctx(&self) -> &AppContext {
        self.supervisor.context()
    }
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route(
            "/services",
            get(handlers::list_services)
                .post(handlers::add_service)
                .delete(handlers::clear_services),
        )
        .route("/services/export", get(handlers::export_services))
        .route("/services/import", post(handlers::import_services))
        .route("/services/scan", post(handlers::scan_inventory))
        .route("/services/{id}", delete(handlers::remove_service))
        .route("/services/{id}/toggle", post(handlers::toggle_service))
        .route("/services/{id}/restart", post(handlers::restart_service))
        .route("/inventory/templates", get(handlers::inventory_templates))
        .route(
            "/inventory/include-system",
            get(handlers::get_include_system).put(handlers::put_include_system),
        )
        .route("/summary", get(handlers::summary))
        .route("/logs", get(handlers::query_logs))
        .route("/logs/{id}/analyze", post(handlers::analyze_log))
        .route("/report", get(handlers::health_report))
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::put_settings),
        )
        .route("/view", get(handlers::get_view).put(handlers::put_view))
        .route("/monitoring", get(handlers::monitoring_status))
        .route("/monitoring/start", post(handlers::start_monitoring))
        .route("/monitoring/stop", post(handlers::stop_monitoring))
        .route("/monitoring/tick", post(handlers::tick_now))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
