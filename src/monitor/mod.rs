//! Connectivity monitoring and reset orchestration.
//!
//! The watch loop schedules checking passes on a fixed interval. A down
//! verdict hands control to the reset orchestrator, which blocks the
//! loop until restoration: monitoring is deliberately single-threaded
//! with respect to reset handling, so a tick can never observe a reset
//! already in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod checker;
mod reset;
mod waiter;

pub use checker::{ConnectivityChecker, BURST_COUNT, BURST_TIMEOUT, DOWN_THRESHOLD_PCT};
pub use reset::{reset_until_restored, RETRY_DELAY};
pub use waiter::{RestorationWaiter, PINGS_REQUIRED, WAIT_TIMEOUT};

use crate::error::Error;
use crate::session::SessionController;

/// Run the watchdog until `cancel` fires.
///
/// Performs an immediate checking pass on entry (unless already
/// cancelled), then one pass per `interval` tick. Check and reset
/// failures are logged and retried on the next tick; nothing short of
/// cancellation stops the loop.
pub async fn watch_reset(
    cancel: CancellationToken,
    session: Arc<dyn SessionController>,
    checker: ConnectivityChecker,
    waiter: RestorationWaiter,
    interval: Duration,
) {
    if cancel.is_cancelled() {
        return;
    }

    info!(interval = ?interval, "starting connectivity monitoring");

    let mut ticker = tokio::time::interval(interval);
    // A reset episode can outlast several intervals; resume the
    // schedule afterwards instead of firing a backlog of ticks.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("connectivity monitoring stopped");
                return;
            }
            // The first tick completes immediately, giving the
            // immediate pass on entry.
            _ = ticker.tick() => {
                check_reset(&cancel, session.as_ref(), &checker, &waiter).await;
            }
        }
    }
}

/// One checking pass, escalating to a reset episode on a down verdict.
async fn check_reset(
    cancel: &CancellationToken,
    session: &dyn SessionController,
    checker: &ConnectivityChecker,
    waiter: &RestorationWaiter,
) {
    match checker.check_remote_connectivity(cancel).await {
        Err(e) => {
            error!(error = %e, "connectivity check failed");
        }
        Ok(true) => {
            info!("connection is alive");
        }
        Ok(false) => {
            warn!("connection is down, reconnecting");
            // The only error an episode can end with is Cancelled; the
            // enclosing loop exits on its next select in that case.
            if let Err(Error::Cancelled) = reset_until_restored(cancel, session, waiter).await {
                info!("reset episode interrupted by shutdown");
            }
        }
    }
}
