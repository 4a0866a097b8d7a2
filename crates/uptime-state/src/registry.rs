//! Service registry: the ordered set of monitored services.
//!
//! The registry owns no behavior beyond keeping its records valid:
//! every write path re-normalizes `uptime` into `[0, 100]`. Duplicate
//! names are not rejected here; that check belongs to the add workflow.

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::types::{Service, ServiceDraft, ServiceStatus};

/// Monitored services in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    services: Vec<Service>,
}

/// Counts shown on the overview page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub total: usize,
    pub running: usize,
    /// Stopped plus paused.
    pub stopped: usize,
    /// Failed plus restarting.
    pub issues: usize,
    pub failed: usize,
    pub average_uptime: f64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from existing records (e.g. a persisted snapshot).
    pub fn from_services(services: Vec<Service>) -> Self {
        let mut registry = Self::new();
        registry.replace_all(services);
        registry
    }

    /// Create a service in `Stopped` with zeroed counters.
    pub fn add(&mut self, draft: ServiceDraft) -> Service {
        self.add_with_status(draft, ServiceStatus::Stopped)
    }

    /// Create a service with an explicit initial status. Used when
    /// converting inventory entries that are already running.
    pub fn add_with_status(&mut self, draft: ServiceDraft, status: ServiceStatus) -> Service {
        let service = Service {
            id: new_service_id(),
            name: draft.name,
            description: draft.description,
            status,
            uptime: 0.0,
            last_restart: None,
            fail_count: 0,
        };
        debug!(id = %service.id, name = %service.name, "service registered");
        self.services.push(service.clone());
        service
    }

    /// Remove a service. Missing ids are a no-op.
    pub fn remove(&mut self, id: &str) -> Option<Service> {
        let index = self.services.iter().position(|s| s.id == id)?;
        Some(self.services.remove(index))
    }

    /// Remove every service, returning how many were dropped.
    pub fn clear_all(&mut self) -> usize {
        let count = self.services.len();
        self.services.clear();
        count
    }

    /// Overwrite a service's status. Returns false if the id is unknown.
    pub fn set_status(&mut self, id: &str, status: ServiceStatus) -> bool {
        self.mutate(id, |s| s.status = status).is_some()
    }

    /// Apply `updater` to one service and return the updated record.
    pub fn mutate<F>(&mut self, id: &str, updater: F) -> Option<Service>
    where
        F: FnOnce(&mut Service),
    {
        let service = self.services.iter_mut().find(|s| s.id == id)?;
        updater(service);
        service.normalize();
        Some(service.clone())
    }

    /// Swap in a whole record, keeping its position. The id must match.
    pub fn replace(&mut self, mut service: Service) -> bool {
        match self.services.iter_mut().find(|s| s.id == service.id) {
            Some(slot) => {
                service.normalize();
                *slot = service;
                true
            }
            None => false,
        }
    }

    /// Replace the entire contents.
    pub fn replace_all(&mut self, services: Vec<Service>) {
        self.services = services;
        for service in &mut self.services {
            service.normalize();
        }
    }

    pub fn list(&self) -> &[Service] {
        &self.services
    }

    pub fn get(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    /// Case-insensitive name lookup.
    pub fn find_by_name(&self, name: &str) -> Option<&Service> {
        let needle = name.to_lowercase();
        self.services
            .iter()
            .find(|s| s.name.to_lowercase() == needle)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.find_by_name(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Whether any service needs manual intervention.
    pub fn has_failures(&self) -> bool {
        self.services
            .iter()
            .any(|s| s.status == ServiceStatus::Failed)
    }

    pub fn summary(&self) -> ServiceSummary {
        let count = |pred: fn(ServiceStatus) -> bool| {
            self.services.iter().filter(|s| pred(s.status)).count()
        };
        let total = self.services.len();
        let average_uptime = if total == 0 {
            0.0
        } else {
            self.services.iter().map(|s| s.uptime).sum::<f64>() / total as f64
        };

        ServiceSummary {
            total,
            running: count(|s| s == ServiceStatus::Running),
            stopped: count(|s| matches!(s, ServiceStatus::Stopped | ServiceStatus::Paused)),
            issues: count(|s| matches!(s, ServiceStatus::Failed | ServiceStatus::Restarting)),
            failed: count(|s| s == ServiceStatus::Failed),
            average_uptime,
        }
    }
}

fn new_service_id() -> String {
    Uuid::new_v4().simple().to_string()
}
