//! uptime-supervisor — control logic for UptimeShield.
//!
//! Everything that changes a service's state lives here: the periodic
//! tick, the per-service transition table, and the operator actions.
//! Health decisions are delegated to a pluggable [`ProbeStrategy`] so
//! tests can force every branch deterministically.
//!
//! # Architecture
//!
//! ```text
//! Supervisor
//!   ├── background tick task (sleep checkInterval → tick, re-armed on change)
//!   │   └── tick()
//!   │       ├── Settings snapshot (watch channel, hot-reloaded)
//!   │       ├── machine::evaluate() per service
//!   │       │   └── ProbeStrategy (SimulatedProbe | FixedProbe | custom)
//!   │       └── Registry replace + EventLog append, under one lock
//!   └── start / stop / tick_now
//!
//! AppContext
//!   ├── Arc<Mutex<Session { Registry, EventLog }>>
//!   ├── settings watch channel
//!   ├── registry revision watch channel (drives persistence)
//!   └── operator actions: toggle, restart, remove, clear_all, add,
//!       import_replace, merge_discovered, export
//! ```

pub mod actions;
pub mod context;
pub mod error;
pub mod machine;
pub mod probe;
pub mod supervisor;

pub use actions::{MergeReport, toggled_status};
pub use context::{AppContext, Session};
pub use error::{ActionError, ActionResult};
pub use machine::{Event, Transition, evaluate};
pub use probe::{FixedProbe, ProbeStrategy, SimulatedProbe};
pub use supervisor::{Supervisor, TickReport, tick};
