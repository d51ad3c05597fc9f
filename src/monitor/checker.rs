//! Burst-based connectivity checking.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, ProbeError, Result};
use crate::probe::Prober;

/// Packet loss percentage below which a destination counts as up. At
/// 100 a destination is only dead when every packet of its burst was
/// lost; a single reply keeps it alive.
pub const DOWN_THRESHOLD_PCT: f64 = 100.0;

/// Packets per burst. Bursts ride out isolated packet loss that a
/// single probe would misread as an outage.
pub const BURST_COUNT: u32 = 3;

/// Total time budget for one destination's burst.
pub const BURST_TIMEOUT: Duration = Duration::from_secs(6);

/// Probes an ordered destination list to produce an up/down verdict.
///
/// Destinations are tried strictly in order and only on failure: the
/// first destination that shows any life short-circuits the pass. The
/// fallback entries exist to avoid false down verdicts caused by one
/// endpoint's own outage, not to spread load.
pub struct ConnectivityChecker {
    dests: Vec<String>,
    prober: Arc<dyn Prober>,
}

impl ConnectivityChecker {
    pub fn new(dests: Vec<String>, prober: Arc<dyn Prober>) -> Self {
        Self { dests, prober }
    }

    /// Run one checking pass. Returns `Ok(true)` if any destination is
    /// reachable, `Ok(false)` if every destination showed full loss.
    ///
    /// A burst that sent zero packets aborts the whole pass with a
    /// configuration error instead of falling through to the next
    /// destination; fallback would mask the misconfiguration.
    pub async fn check_remote_connectivity(&self, cancel: &CancellationToken) -> Result<bool> {
        for dest in &self.dests {
            let stats = self
                .prober
                .burst(dest, BURST_COUNT, BURST_TIMEOUT, cancel.clone())
                .await?;

            if stats.sent == 0 {
                return Err(Error::Probe(ProbeError::NoPacketsSent(dest.clone())));
            }

            debug!(
                remote_host = %dest,
                packets_sent = stats.sent,
                packets_dropped = stats.sent - stats.received,
                latency = ?stats.avg_rtt,
                "ping complete"
            );

            // Only try the next destination if this one failed.
            if stats.loss_pct() < DOWN_THRESHOLD_PCT {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
