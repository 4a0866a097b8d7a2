//! Per-service tick transition.
//!
//! [`evaluate`] is a pure function of the service's current record, the
//! probe's two decisions, and the settings in force for this tick. It
//! returns the replacement record plus the log events the transition
//! must emit, in order. The caller applies both atomically.
//!
//! ```text
//! Running    ──probe fails, autoRestart──▶ Restarting   (ERROR, WARNING, failCount+1)
//! Running    ──probe fails──────────────▶ Failed        (ERROR, failCount+1)
//! Running    ──probe ok─────────────────▶ Running       (uptime += 0.01)
//! Restarting ──recovery ok──────────────▶ Running       (SUCCESS, lastRestart = now)
//! Restarting ──recovery fails, budget spent──▶ Failed   (ERROR [, INFO notify])
//! Restarting ──recovery fails──────────▶ Restarting    (WARNING, failCount+1)
//! Stopped / Paused / Failed ─────────────▶ unchanged
//! ```

use chrono::{DateTime, Utc};

use uptime_state::{LogLevel, Service, ServiceStatus, Settings};

use crate::probe::ProbeStrategy;

/// Uptime gained per healthy tick.
pub const UPTIME_STEP: f64 = 0.01;

/// A log event produced by a transition, not yet appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub level: LogLevel,
    pub message: String,
}

impl Event {
    fn new(level: LogLevel, message: String) -> Self {
        Self { level, message }
    }
}

/// Outcome of evaluating one service on one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The record to write back.
    pub service: Service,
    /// Events to append, in order.
    pub events: Vec<Event>,
}

impl Transition {
    /// Whether the status changed.
    pub fn changed_status(&self, before: ServiceStatus) -> bool {
        self.service.status != before
    }
}

/// Evaluate one tick for `service`. Returns `None` for inert states.
pub fn evaluate(
    service: &Service,
    probe: &dyn ProbeStrategy,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Option<Transition> {
    match service.status {
        ServiceStatus::Running => Some(evaluate_running(service, probe, settings)),
        ServiceStatus::Restarting => Some(evaluate_restarting(service, probe, settings, now)),
        ServiceStatus::Stopped | ServiceStatus::Paused | ServiceStatus::Failed => None,
    }
}

fn evaluate_running(service: &Service, probe: &dyn ProbeStrategy, settings: &Settings) -> Transition {
    let mut next = service.clone();

    if !probe.heartbeat_fails(service) {
        next.uptime = (next.uptime + UPTIME_STEP).min(100.0);
        return Transition {
            service: next,
            events: Vec::new(),
        };
    }

    let mut events = vec![Event::new(
        LogLevel::Error,
        format!("Heartbeat failed for {}. Connection timed out.", service.name),
    )];
    next.fail_count = next.fail_count.saturating_add(1);

    if settings.auto_restart {
        next.status = ServiceStatus::Restarting;
        events.push(Event::new(
            LogLevel::Warning,
            format!("Initiating auto-restart sequence for {}...", service.name),
        ));
    } else {
        next.status = ServiceStatus::Failed;
    }

    Transition {
        service: next,
        events,
    }
}

fn evaluate_restarting(
    service: &Service,
    probe: &dyn ProbeStrategy,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Transition {
    let mut next = service.clone();
    let mut events = Vec::new();

    if probe.restart_succeeds(service) {
        next.status = ServiceStatus::Running;
        next.last_restart = Some(now);
        events.push(Event::new(
            LogLevel::Success,
            format!("Service {} restarted successfully.", service.name),
        ));
    } else if service.fail_count >= settings.max_retries {
        next.status = ServiceStatus::Failed;
        events.push(Event::new(
            LogLevel::Error,
            format!(
                "CRITICAL: {} failed to restart after {} attempts.",
                service.name, service.fail_count
            ),
        ));
        if settings.email_notifications {
            events.push(Event::new(
                LogLevel::Info,
                format!(
                    "Sending failure notification email to {}",
                    settings.recipient_email
                ),
            ));
        }
    } else {
        next.fail_count = next.fail_count.saturating_add(1);
        events.push(Event::new(
            LogLevel::Warning,
            format!("Restart attempt failed for {}. Retrying...", service.name),
        ));
    }

    Transition {
        service: next,
        events,
    }
}
