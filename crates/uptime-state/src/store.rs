//! StateStore: redb-backed key-value persistence for UptimeShield.
//!
//! Values are JSON-serialized into a single table under the stable keys
//! in [`crate::tables`]. The store supports both on-disk and in-memory
//! backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::{ActiveView, Service, Settings};

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(DASHBOARD).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StateResult<()> {
        let bytes = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(DASHBOARD).map_err(map_err!(Table))?;
            table
                .insert(key, bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, bytes = bytes.len(), "value stored");
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DASHBOARD).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let value: T =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    // ── Registry ───────────────────────────────────────────────────

    /// Persist a registry snapshot.
    pub fn save_services(&self, services: &[Service]) -> StateResult<()> {
        self.put_json(SERVICES_KEY, services)
    }

    /// Load the registry snapshot, or an empty list if none was saved.
    pub fn load_services(&self) -> StateResult<Vec<Service>> {
        Ok(self.get_json(SERVICES_KEY)?.unwrap_or_default())
    }

    // ── Settings ───────────────────────────────────────────────────

    pub fn save_settings(&self, settings: &Settings) -> StateResult<()> {
        self.put_json(SETTINGS_KEY, settings)
    }

    pub fn load_settings(&self) -> StateResult<Option<Settings>> {
        self.get_json(SETTINGS_KEY)
    }

    // ── View / preferences ─────────────────────────────────────────

    pub fn save_active_view(&self, view: ActiveView) -> StateResult<()> {
        self.put_json(ACTIVE_VIEW_KEY, &view)
    }

    pub fn load_active_view(&self) -> StateResult<ActiveView> {
        Ok(self.get_json(ACTIVE_VIEW_KEY)?.unwrap_or_default())
    }

    pub fn save_show_hidden(&self, show: bool) -> StateResult<()> {
        self.put_json(SHOW_HIDDEN_KEY, &show)
    }

    pub fn load_show_hidden(&self) -> StateResult<bool> {
        Ok(self.get_json(SHOW_HIDDEN_KEY)?.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::types::{ServiceDraft, ServiceStatus};

    fn sample_services() -> Vec<Service> {
        let mut registry = Registry::new();
        registry.add(ServiceDraft::new("nginx", "web"));
        registry.add_with_status(ServiceDraft::new("redis", "cache"), ServiceStatus::Running);
        registry.list().to_vec()
    }

    #[test]
    fn services_put_and_get() {
        let store = StateStore::open_in_memory().unwrap();
        let services = sample_services();

        store.save_services(&services).unwrap();
        assert_eq!(store.load_services().unwrap(), services);
    }

    #[test]
    fn services_overwrite() {
        let store = StateStore::open_in_memory().unwrap();
        store.save_services(&sample_services()).unwrap();
        store.save_services(&[]).unwrap();
        assert!(store.load_services().unwrap().is_empty());
    }

    #[test]
    fn settings_put_and_get() {
        let store = StateStore::open_in_memory().unwrap();
        let mut settings = Settings::default();
        settings.check_interval = 15;
        settings.smtp_password = "hunter2".to_string();

        store.save_settings(&settings).unwrap();
        assert_eq!(store.load_settings().unwrap(), Some(settings));
    }

    #[test]
    fn view_and_preferences() {
        let store = StateStore::open_in_memory().unwrap();
        store.save_active_view(ActiveView::Logs).unwrap();
        store.save_show_hidden(true).unwrap();

        assert_eq!(store.load_active_view().unwrap(), ActiveView::Logs);
        assert!(store.load_show_hidden().unwrap());
    }

    #[test]
    fn empty_store_defaults() {
        let store = StateStore::open_in_memory().unwrap();

        assert!(store.load_services().unwrap().is_empty());
        assert!(store.load_settings().unwrap().is_none());
        assert_eq!(store.load_active_view().unwrap(), ActiveView::Overview);
        assert!(!store.load_show_hidden().unwrap());
    }

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("uptime.redb");
        let services = sample_services();

        {
            let store = StateStore::open(&db_path).unwrap();
            store.save_services(&services).unwrap();
            store.save_active_view(ActiveView::Services).unwrap();
        }

        // Reopen the same database file.
        let store = StateStore::open(&db_path).unwrap();
        assert_eq!(store.load_services().unwrap(), services);
        assert_eq!(store.load_active_view().unwrap(), ActiveView::Services);
    }
}
