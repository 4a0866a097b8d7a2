//! redb table and key definitions for the UptimeShield store.
//!
//! A single `&str → &[u8]` table holds JSON values under stable keys, so
//! the persisted layout matches the dashboard's local-storage keys.

use redb::TableDefinition;

/// Key-value table for everything that survives a restart.
pub const DASHBOARD: TableDefinition<&str, &[u8]> = TableDefinition::new("dashboard");

/// Registry snapshot (JSON array of services).
pub const SERVICES_KEY: &str = "uptimeshield_services";

/// Recognized settings.
pub const SETTINGS_KEY: &str = "uptimeshield_settings";

/// Last active view.
pub const ACTIVE_VIEW_KEY: &str = "uptimeshield_active_view";

/// Inventory operator override (include protected system paths).
pub const SHOW_HIDDEN_KEY: &str = "uptimeshield_show_hidden_services";
