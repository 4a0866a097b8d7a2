//! System service inventory: the HTTP client for the host's service
//! listing and the policy that turns its entries into registry
//! candidates.
//!
//! The listing endpoint returns `[{Name, DisplayName, PathName, State}]`.
//! Entries whose executable lives under a protected system prefix are
//! hidden unless the operator override is on.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use uptime_state::{DiscoveredService, ServiceDraft, ServiceStatus};

use crate::error::{AdapterError, AdapterResult};

/// Path prefixes (lowercase, unquoted) treated as operating-system owned.
pub const PROTECTED_PREFIXES: [&str; 3] = [
    "c:\\windows",
    "c:\\program files",
    "c:\\programdata",
];

/// Default timeout for an inventory request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One entry of the host's service listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemService {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "DisplayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "PathName", default)]
    pub path_name: Option<String>,
    #[serde(rename = "State", default)]
    pub state: Option<String>,
}

impl SystemService {
    /// `Name`, falling back to `DisplayName`. Blank values count as absent.
    pub fn service_name(&self) -> Option<&str> {
        non_blank(self.name.as_deref()).or_else(|| non_blank(self.display_name.as_deref()))
    }

    pub fn is_running(&self) -> bool {
        self.state.as_deref() == Some("Running")
    }

    /// Whether the executable path is empty or under a protected prefix.
    pub fn is_protected(&self) -> bool {
        let path = self
            .path_name
            .as_deref()
            .unwrap_or_default()
            .replace('"', "")
            .to_lowercase();
        path.is_empty() || PROTECTED_PREFIXES.iter().any(|p| path.starts_with(p))
    }

    /// Registry candidate for this entry, if it has a usable name.
    pub fn to_discovered(&self) -> Option<DiscoveredService> {
        let name = self.service_name()?;
        let status = if self.is_running() {
            ServiceStatus::Running
        } else {
            ServiceStatus::Stopped
        };
        Some(DiscoveredService {
            draft: ServiceDraft::new(name, self.display_name.clone().unwrap_or_default()),
            status,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Drop protected entries unless `include_system` is set.
pub fn filter_protected(entries: Vec<SystemService>, include_system: bool) -> Vec<SystemService> {
    if include_system {
        return entries;
    }
    entries.into_iter().filter(|e| !e.is_protected()).collect()
}

/// Filtered listing sorted by name, for picking a service to add.
pub fn templates(entries: Vec<SystemService>, include_system: bool) -> Vec<SystemService> {
    let mut visible: Vec<_> = filter_protected(entries, include_system)
        .into_iter()
        .filter(|e| e.service_name().is_some())
        .collect();
    visible.sort_by_cached_key(|e| e.service_name().unwrap_or_default().to_lowercase());
    visible
}

/// Result of applying the filter policy to a listing. Dedup against
/// the registry happens when the candidates are merged.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPlan {
    /// Entries returned by the inventory.
    pub discovered: usize,
    /// Entries hidden by the protected-path policy or lacking a name.
    pub filtered: usize,
    pub candidates: Vec<DiscoveredService>,
}

/// Apply the filter policy and convert survivors into candidates.
pub fn plan_scan(entries: Vec<SystemService>, include_system: bool) -> ScanPlan {
    let discovered = entries.len();
    let candidates: Vec<_> = filter_protected(entries, include_system)
        .iter()
        .filter_map(SystemService::to_discovered)
        .collect();
    ScanPlan {
        discovered,
        filtered: discovered - candidates.len(),
        candidates,
    }
}

/// HTTP client for the inventory endpoint.
#[derive(Debug, Clone)]
pub struct InventoryClient {
    client: Client,
    url: String,
}

impl InventoryClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> AdapterResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("uptimeshield/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AdapterError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the host's service listing.
    pub async fn list_system_services(&self) -> AdapterResult<Vec<SystemService>> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            warn!(url = %self.url, error = %e, "inventory request failed");
            AdapterError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, %status, "inventory returned an error status");
            return Err(AdapterError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let entries = parse_listing(&body)?;
        debug!(url = %self.url, count = entries.len(), "inventory fetched");
        Ok(entries)
    }
}

/// Decode a listing body. The top level must be an array.
pub fn parse_listing(body: &str) -> AdapterResult<Vec<SystemService>> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| AdapterError::Malformed(e.to_string()))?;
    if !value.is_array() {
        return Err(AdapterError::Malformed("expected a JSON array".to_string()));
    }
    serde_json::from_value(value).map_err(|e| AdapterError::Malformed(e.to_string()))
}
