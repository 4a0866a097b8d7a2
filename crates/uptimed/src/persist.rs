//! Registry persistence loop.
//!
//! Saves a registry snapshot every time the context's registry revision
//! changes, and once more on shutdown. The event log is never saved.

use tokio::sync::watch;
use tracing::{debug, error};

use uptime_state::StateStore;
use uptime_supervisor::AppContext;

pub async fn run_persist_loop(
    ctx: AppContext,
    store: StateStore,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut revision = ctx.subscribe_registry();

    loop {
        tokio::select! {
            changed = revision.changed() => {
                if changed.is_err() {
                    break;
                }
                let rev = *revision.borrow_and_update();
                save(&ctx, &store).await;
                debug!(revision = rev, "registry snapshot saved");
            }
            _ = shutdown.changed() => {
                debug!("persistence loop shutting down");
                break;
            }
        }
    }

    save(&ctx, &store).await;
}

async fn save(ctx: &AppContext, store: &StateStore) {
    let services = ctx.services().await;
    if let Err(e) = store.save_services(&services) {
        error!(error = %e, "failed to persist registry");
    }
}
