//! uptime-state — passive data stores for UptimeShield.
//!
//! Holds everything the supervisor reads and writes but none of the
//! control logic: the monitored service records, the append-only event
//! log, the recognized settings, the JSON export/import format, and a
//! redb-backed key-value store for the pieces that survive a restart.
//!
//! # Architecture
//!
//! ```text
//! Registry  (ordered Vec<Service>, clamps uptime to [0, 100])
//! EventLog  (append-only Vec<LogEntry>, monotonic timestamps)
//! Settings  (validated option set, hot-reloaded by the supervisor)
//! transfer  (export → JSON array, import ← validated JSON array)
//! StateStore
//!   └── "dashboard" table: stable key → JSON value
//! ```
//!
//! The event log is session-only and never written to the store.

pub mod error;
pub mod event_log;
pub mod registry;
pub mod store;
pub mod tables;
pub mod transfer;
pub mod types;

pub use error::{ConfigError, ImportError, StateError, StateResult};
pub use event_log::{EventLog, LogFilter};
pub use registry::{Registry, ServiceSummary};
pub use store::StateStore;
pub use types::*;
