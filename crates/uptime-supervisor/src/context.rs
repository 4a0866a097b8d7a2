//! Application context: the session-wide registry, event log, and
//! settings, shared by the supervisor and every action handler.
//!
//! The registry and log sit behind one async mutex so that a tick and a
//! manual action can never interleave on the same record. Settings live
//! in a `watch` channel: readers always see the latest value and the
//! supervisor is woken when it changes.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::info;

use uptime_state::{EventLog, Registry, Service, Settings};

use crate::error::ActionResult;

/// Mutable session state guarded as a single unit.
#[derive(Debug, Default)]
pub struct Session {
    pub registry: Registry,
    pub log: EventLog,
}

/// Cheaply cloneable handle to the shared session.
#[derive(Clone)]
pub struct AppContext {
    session: Arc<Mutex<Session>>,
    settings: Arc<watch::Sender<Settings>>,
    revision: Arc<watch::Sender<u64>>,
}

impl AppContext {
    /// Empty registry, empty log, the given settings.
    pub fn new(settings: Settings) -> Self {
        Self::with_services(settings, Vec::new())
    }

    /// Start from a previously persisted registry snapshot.
    pub fn with_services(settings: Settings, services: Vec<Service>) -> Self {
        let session = Session {
            registry: Registry::from_services(services),
            log: EventLog::new(),
        };
        let (settings_tx, _) = watch::channel(settings);
        let (revision_tx, _) = watch::channel(0);
        Self {
            session: Arc::new(Mutex::new(session)),
            settings: Arc::new(settings_tx),
            revision: Arc::new(revision_tx),
        }
    }

    /// Exclusive access to the registry and log.
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().await
    }

    /// Snapshot of the registry in insertion order.
    pub async fn services(&self) -> Vec<Service> {
        self.lock().await.registry.list().to_vec()
    }

    /// Current settings.
    pub fn settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    /// Validate and publish new settings. Takes effect on the next tick.
    pub fn update_settings(&self, settings: Settings) -> ActionResult<()> {
        settings.validate()?;
        info!(
            check_interval = settings.check_interval,
            auto_restart = settings.auto_restart,
            max_retries = settings.max_retries,
            "settings updated"
        );
        self.settings.send_replace(settings);
        Ok(())
    }

    pub fn subscribe_settings(&self) -> watch::Receiver<Settings> {
        self.settings.subscribe()
    }

    /// Receiver that changes whenever the registry is written.
    pub fn subscribe_registry(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Bump the registry revision. Called after every registry write.
    pub fn mark_registry_changed(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
