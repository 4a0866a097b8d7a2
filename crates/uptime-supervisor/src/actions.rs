//! Manual operator actions.
//!
//! Each action takes the session lock once, validates, mutates the
//! registry, and appends its log entry before releasing it. Rejected
//! actions leave both the registry and the log untouched.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use uptime_state::transfer::{export_services, parse_import};
use uptime_state::{DiscoveredService, LogLevel, Service, ServiceDraft, ServiceStatus};

use crate::context::AppContext;
use crate::error::{ActionError, ActionResult};

/// Outcome of merging an inventory scan into the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Candidates offered for merging.
    pub offered: usize,
    /// Skipped because the name already existed.
    pub duplicates: usize,
    pub added: Vec<Service>,
}

/// State a manual toggle moves `current` into.
pub fn toggled_status(current: ServiceStatus) -> ServiceStatus {
    match current {
        ServiceStatus::Stopped | ServiceStatus::Paused => ServiceStatus::Running,
        _ => ServiceStatus::Paused,
    }
}

impl AppContext {
    /// Flip a service between running and paused, clearing its fail count.
    pub async fn toggle(&self, id: &str) -> ActionResult<Service> {
        let mut session = self.lock().await;
        let updated = session
            .registry
            .mutate(id, |s| {
                s.status = toggled_status(s.status);
                s.fail_count = 0;
            })
            .ok_or_else(|| ActionError::ServiceNotFound(id.to_string()))?;

        session.log.append_for(
            &updated,
            LogLevel::Info,
            format!(
                "User manually changed state of {} to {}",
                updated.name, updated.status
            ),
        );
        drop(session);
        self.mark_registry_changed();

        info!(service_id = %id, status = %updated.status, "service toggled");
        Ok(updated)
    }

    /// Force a service into `Restarting`; the next tick evaluates it.
    pub async fn restart(&self, id: &str) -> ActionResult<Service> {
        let mut session = self.lock().await;
        let updated = session
            .registry
            .mutate(id, |s| s.status = ServiceStatus::Restarting)
            .ok_or_else(|| ActionError::ServiceNotFound(id.to_string()))?;

        session.log.append_for(
            &updated,
            LogLevel::Warning,
            format!("Manual restart initiated for {}", updated.name),
        );
        drop(session);
        self.mark_registry_changed();

        info!(service_id = %id, "manual restart requested");
        Ok(updated)
    }

    /// Remove a service. Unknown ids are a no-op but still logged.
    pub async fn remove(&self, id: &str) -> Option<Service> {
        let mut session = self.lock().await;
        let removed = session.registry.remove(id);
        session.log.append(
            LogLevel::Info,
            format!("Service configuration removed (ID: {id})"),
            None,
            None,
        );
        drop(session);

        if removed.is_some() {
            self.mark_registry_changed();
            info!(service_id = %id, "service removed");
        } else {
            debug!(service_id = %id, "remove of unknown service ignored");
        }
        removed
    }

    /// Empty the registry, returning how many services were dropped.
    pub async fn clear_all(&self) -> usize {
        let mut session = self.lock().await;
        let count = session.registry.clear_all();
        session.log.append(
            LogLevel::Info,
            format!("All services removed ({count} cleared)."),
            None,
            None,
        );
        drop(session);
        self.mark_registry_changed();

        info!(count, "registry cleared");
        count
    }

    /// Register a new service in `Stopped`. Names are unique,
    /// case-insensitively.
    pub async fn add(&self, draft: ServiceDraft) -> ActionResult<Service> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(ActionError::EmptyName);
        }
        let draft = ServiceDraft {
            name,
            description: draft.description,
        };

        let mut session = self.lock().await;
        if session.registry.contains_name(&draft.name) {
            return Err(ActionError::DuplicateName(draft.name));
        }
        let service = session.registry.add(draft);
        session.log.append_for(
            &service,
            LogLevel::Info,
            format!("New service added: {}", service.name),
        );
        drop(session);
        self.mark_registry_changed();

        info!(service_id = %service.id, name = %service.name, "service added");
        Ok(service)
    }

    /// Replace the whole registry with an exported payload. The payload
    /// is validated in full first; on error nothing changes.
    pub async fn import_replace(&self, payload: &str) -> ActionResult<usize> {
        let services = parse_import(payload)?;
        let count = services.len();

        let mut session = self.lock().await;
        session.registry.replace_all(services);
        session.log.append(
            LogLevel::Success,
            format!("Configuration imported: {count} services loaded."),
            None,
            None,
        );
        drop(session);
        self.mark_registry_changed();

        info!(count, "registry imported");
        Ok(count)
    }

    /// Add discovered services whose names are not yet registered.
    /// Duplicates within the batch are skipped too.
    pub async fn merge_discovered(&self, candidates: Vec<DiscoveredService>) -> MergeReport {
        let offered = candidates.len();
        let mut session = self.lock().await;

        let mut seen: HashSet<String> = session
            .registry
            .list()
            .iter()
            .map(|s| s.name.to_lowercase())
            .collect();
        let mut added = Vec::new();
        for candidate in candidates {
            if !seen.insert(candidate.draft.name.to_lowercase()) {
                continue;
            }
            added.push(
                session
                    .registry
                    .add_with_status(candidate.draft, candidate.status),
            );
        }
        let duplicates = offered - added.len();

        if !added.is_empty() {
            session.log.append(
                LogLevel::Success,
                format!(
                    "Configuration imported: {} services loaded ({duplicates} duplicates skipped).",
                    added.len()
                ),
                None,
                None,
            );
        }
        drop(session);

        if !added.is_empty() {
            self.mark_registry_changed();
        }
        info!(offered, added = added.len(), duplicates, "inventory merged");
        MergeReport {
            offered,
            duplicates,
            added,
        }
    }

    /// Pretty-printed JSON array of the current registry.
    pub async fn export(&self) -> Result<String, serde_json::Error> {
        let session = self.lock().await;
        export_services(session.registry.list())
    }
}
