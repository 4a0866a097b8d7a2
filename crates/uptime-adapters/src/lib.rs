//! uptime-adapters — external collaborators of UptimeShield.
//!
//! Both adapters are called only on operator request and never from the
//! tick loop. Their failures are returned as [`AdapterError`] (inventory)
//! or folded into fixed advisory text (diagnostics); neither writes to
//! the event log.
//!
//! ```text
//! InventoryClient ── GET /api/services ──▶ Vec<SystemService>
//!   └── plan_scan(): protected-path filter → Vec<DiscoveredService>
//!
//! DiagnosticAdvisor
//!   └── TextGenerator (GeminiGenerator | custom)
//! ```

pub mod diagnostics;
pub mod error;
pub mod inventory;

pub use diagnostics::{DiagnosticAdvisor, GeminiGenerator, GenerationRequest, TextGenerator};
pub use error::{AdapterError, AdapterResult};
pub use inventory::{InventoryClient, ScanPlan, SystemService, plan_scan, templates};
