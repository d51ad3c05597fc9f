//! The reset orchestrator: drive the modem through a reconnect and wait
//! for confirmed restoration, retrying the whole sequence until one
//! attempt succeeds.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::monitor::waiter::RestorationWaiter;
use crate::session::SessionController;

/// Pause between failed attempts. The retry loop has no attempt cap,
/// so a persistently broken device must not be hammered back-to-back.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Run one down-to-restored episode.
///
/// Each attempt walks the full sequence: validate or re-establish the
/// session, disconnect, reconnect, then wait for restoration. Any step
/// failure (except disconnect, which is tolerated) abandons the attempt
/// and a fresh one starts from the top after [`RETRY_DELAY`]. The
/// episode only ends on a successful attempt or root cancellation.
pub async fn reset_until_restored(
    cancel: &CancellationToken,
    session: &dyn SessionController,
    waiter: &RestorationWaiter,
) -> Result<()> {
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            outcome = run_attempt(cancel, session, waiter) => outcome,
        };

        match outcome {
            Ok(()) => {
                info!(attempt, "connection restored");
                return Ok(());
            }
            Err(e) => {
                warn!(attempt, error = %e, "reset attempt failed, retrying");
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            _ = tokio::time::sleep(RETRY_DELAY) => {}
        }
    }
}

async fn run_attempt(
    cancel: &CancellationToken,
    session: &dyn SessionController,
    waiter: &RestorationWaiter,
) -> Result<()> {
    if !session.test_session().await? {
        session.login().await?;
    }

    // A failed disconnect must not block the reconnect: the modem may
    // already consider itself disconnected.
    if let Err(e) = session.set_modem_state(false).await {
        warn!(error = %e, "failed to disconnect modem, attempting reconnect anyway");
    }

    session.set_modem_state(true).await?;

    waiter.wait_for_remote_connectivity(cancel).await
}
