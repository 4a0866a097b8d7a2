//! Supervisor: the cancellable periodic tick loop.
//!
//! One background task sleeps for `checkInterval` seconds, then runs a
//! tick: every service is evaluated against the same settings snapshot
//! and clock reading while the session lock is held, so a tick always
//! completes before any action or the next tick sees the registry.
//!
//! The loop re-arms its timer when the interval setting changes. A tick
//! already in progress is never cut short by the re-arm, and no tick
//! fires after [`Supervisor::stop`] returns.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use uptime_state::LogLevel;

use crate::context::{AppContext, Session};
use crate::machine::evaluate;
use crate::probe::ProbeStrategy;

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    /// Services in a non-inert state.
    pub evaluated: usize,
    /// Services whose status changed.
    pub transitions: usize,
    /// Log entries appended.
    pub events: usize,
}

/// Handle to the running loop.
struct LoopSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// Owns the periodic tick task for one application context.
pub struct Supervisor {
    ctx: AppContext,
    probe: Arc<dyn ProbeStrategy>,
    slot: Mutex<Option<LoopSlot>>,
}

impl Supervisor {
    pub fn new(ctx: AppContext, probe: Arc<dyn ProbeStrategy>) -> Self {
        Self {
            ctx,
            probe,
            slot: Mutex::new(None),
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Start ticking. Returns false if monitoring was already on.
    pub async fn start(&self) -> bool {
        let mut slot = self.slot.lock().await;
        if slot.is_some() {
            return false;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ctx = self.ctx.clone();
        let probe = self.probe.clone();
        let handle = tokio::spawn(async move {
            run_tick_loop(ctx, probe, shutdown_rx).await;
        });
        *slot = Some(LoopSlot {
            handle,
            shutdown_tx,
        });
        drop(slot);

        self.ctx
            .lock()
            .await
            .log
            .append(LogLevel::Info, "Monitoring started by user.", None, None);
        info!(
            check_interval = self.ctx.settings().check_interval,
            "monitoring started"
        );
        true
    }

    /// Stop ticking and wait for the task to finish. Returns false if
    /// monitoring was already off.
    pub async fn stop(&self) -> bool {
        let Some(slot) = self.slot.lock().await.take() else {
            return false;
        };

        let _ = slot.shutdown_tx.send(true);
        slot.handle.abort();
        let _ = slot.handle.await;

        self.ctx
            .lock()
            .await
            .log
            .append(LogLevel::Info, "Monitoring stopped by user.", None, None);
        info!("monitoring stopped");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Run one tick immediately, independent of the timer.
    pub async fn tick_now(&self) -> TickReport {
        tick(&self.ctx, self.probe.as_ref()).await
    }
}

/// Evaluate every service once and apply the results.
pub async fn tick(ctx: &AppContext, probe: &dyn ProbeStrategy) -> TickReport {
    let settings = ctx.settings();
    let now = Utc::now();

    let mut session = ctx.lock().await;
    let Session { registry, log } = &mut *session;
    let mut report = TickReport::default();

    for service in registry.list().to_vec() {
        let Some(transition) = evaluate(&service, probe, &settings, now) else {
            continue;
        };
        report.evaluated += 1;

        if transition.changed_status(service.status) {
            report.transitions += 1;
            debug!(
                service_id = %service.id,
                from = %service.status,
                to = %transition.service.status,
                fail_count = transition.service.fail_count,
                "service transitioned"
            );
        }
        for event in transition.events {
            log.append_at(
                now,
                event.level,
                event.message,
                Some(service.id.as_str()),
                Some(service.name.as_str()),
            );
            report.events += 1;
        }
        registry.replace(transition.service);
    }
    drop(session);

    if report.evaluated > 0 {
        ctx.mark_registry_changed();
    }
    debug!(
        evaluated = report.evaluated,
        transitions = report.transitions,
        events = report.events,
        "tick complete"
    );
    report
}

async fn run_tick_loop(
    ctx: AppContext,
    probe: Arc<dyn ProbeStrategy>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut settings_rx = ctx.subscribe_settings();
    let mut period = settings_rx.borrow_and_update().interval();
    let sleep = tokio::time::sleep(period);
    tokio::pin!(sleep);

    debug!(?period, "tick loop starting");

    loop {
        tokio::select! {
            _ = &mut sleep => {
                tick(&ctx, probe.as_ref()).await;
                sleep.as_mut().reset(Instant::now() + period);
            }
            changed = settings_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = settings_rx.borrow_and_update().interval();
                if next != period {
                    info!(from = ?period, to = ?next, "check interval changed, re-arming timer");
                    period = next;
                    sleep.as_mut().reset(Instant::now() + period);
                }
            }
            _ = shutdown.changed() => {
                debug!("tick loop shutting down");
                break;
            }
        }
    }
}
