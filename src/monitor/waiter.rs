//! Restoration waiting: concurrent open-ended probes against every
//! destination, stopped as soon as enough replies have arrived anywhere.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::probe::{Prober, RecvCallback};

/// Replies required, cumulatively across all destinations, before the
/// connection is deemed restored. Count-based on purpose: a slow
/// trickle spread over several destinations is acceptable proof of
/// recovery, unlike the checker's all-or-nothing burst rule.
pub const PINGS_REQUIRED: u32 = 2;

/// How long each open-ended probe keeps trying on its own.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Waits for connectivity to come back after a reset.
pub struct RestorationWaiter {
    dests: Vec<String>,
    prober: Arc<dyn Prober>,
    required: u32,
    timeout: Duration,
}

impl RestorationWaiter {
    pub fn new(dests: Vec<String>, prober: Arc<dyn Prober>) -> Self {
        Self {
            dests,
            prober,
            required: PINGS_REQUIRED,
            timeout: WAIT_TIMEOUT,
        }
    }

    /// Override the required reply count.
    pub fn with_required(mut self, required: u32) -> Self {
        self.required = required;
        self
    }

    /// Override the per-probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Probe every destination concurrently until [`PINGS_REQUIRED`]
    /// replies have arrived in total, then stop all probes.
    ///
    /// The stop signal is a child of `cancel`, so cancelling the root
    /// tears down every probe while meeting the target never touches
    /// the root. All probe tasks are joined before the final count is
    /// inspected; if it fell short, every probe timed out first and the
    /// connection is declared not restored.
    pub async fn wait_for_remote_connectivity(&self, cancel: &CancellationToken) -> Result<()> {
        let scope = cancel.child_token();
        let received = Arc::new(AtomicU32::new(0));
        let mut probes = Vec::with_capacity(self.dests.len());

        for dest in &self.dests {
            let prober = Arc::clone(&self.prober);
            let dest = dest.clone();
            let probe_scope = scope.clone();
            let timeout = self.timeout;

            let on_recv = self.make_recv_callback(dest.clone(), &scope, &received);

            probes.push(tokio::spawn(async move {
                prober.ping_until(&dest, timeout, probe_scope, on_recv).await
            }));
        }

        // Wait for every probe to fully stop before judging the count.
        let mut first_err = None;
        for probe in probes {
            match probe.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "restoration probe failed");
                    first_err.get_or_insert(e);
                }
                Err(e) => warn!(error = %e, "restoration probe panicked"),
            }
        }

        if received.load(Ordering::SeqCst) >= self.required {
            return Ok(());
        }

        // A probe that never got off the ground (unresolvable host,
        // socket failure) is more useful to report than a bare timeout.
        match first_err {
            Some(e) => Err(e),
            None => Err(Error::NotRestored),
        }
    }

    /// Build the per-reply callback: one shared atomic counter, with
    /// the probe scope cancelled the moment the target is hit.
    ///
    /// `fetch_add` makes concurrent callbacks from different probe
    /// tasks safe; exactly one of them observes the count crossing the
    /// threshold and fires the cancellation.
    fn make_recv_callback(
        &self,
        dest: String,
        scope: &CancellationToken,
        received: &Arc<AtomicU32>,
    ) -> RecvCallback {
        let scope = scope.clone();
        let received = Arc::clone(received);
        let required = self.required;

        Arc::new(move |rtt| {
            let count = received.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(
                remote_host = %dest,
                packets_received = count,
                latency = ?rtt,
                "restoration reply received"
            );
            if count >= required {
                scope.cancel();
            }
        })
    }
}
