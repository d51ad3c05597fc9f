//! ICMP echo probing primitive.
//!
//! A [`Pinger`] targets one destination and supports two modes:
//!
//! - [`Pinger::burst`]: a bounded-count, bounded-timeout run yielding
//!   aggregate loss and latency statistics.
//! - [`Pinger::ping_until`]: an open-ended run that reports every
//!   received reply through a callback and stops on cancellation or its
//!   own timeout.
//!
//! The privileged flag selects raw ICMP sockets over unprivileged ICMP
//! datagram sockets. On Linux the unprivileged variant requires
//! `net.ipv4.ping_group_range` to cover the process group.

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::error::{ProbeError, Result};

pub mod packet;

use packet::{build_echo_request, parse_echo_reply, strip_ipv4_header, EchoReply};

/// Pacing interval between echo requests in open-ended mode.
const PING_INTERVAL: Duration = Duration::from_secs(1);

/// Receive buffer size; replies are tiny but raw sockets may deliver
/// unrelated ICMP traffic of arbitrary size.
const RECV_BUF_LEN: usize = 1500;

/// Callback invoked for every received echo reply, carrying its RTT.
pub type RecvCallback = Arc<dyn Fn(Duration) + Send + Sync>;

/// Aggregate statistics of one burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingStats {
    /// Echo requests actually sent.
    pub sent: u32,
    /// Echo replies received.
    pub received: u32,
    /// Mean round-trip time over received replies.
    pub avg_rtt: Option<Duration>,
}

impl PingStats {
    /// Packet loss as a percentage of sent packets.
    ///
    /// A zero-packet burst reports full loss here, but callers must
    /// treat `sent == 0` as a configuration error before reading this.
    pub fn loss_pct(&self) -> f64 {
        if self.sent == 0 {
            return 100.0;
        }
        f64::from(self.sent - self.received) / f64::from(self.sent) * 100.0
    }
}

/// Probing seam consumed by the monitor components.
///
/// The production implementation is [`IcmpProber`]; tests substitute
/// scripted fakes.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Run a bounded burst against `dest`.
    async fn burst(
        &self,
        dest: &str,
        count: u32,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<PingStats>;

    /// Run an open-ended probe against `dest` until cancelled or until
    /// `timeout` elapses, invoking `on_recv` per received reply.
    async fn ping_until(
        &self,
        dest: &str,
        timeout: Duration,
        cancel: CancellationToken,
        on_recv: RecvCallback,
    ) -> Result<()>;
}

/// [`Prober`] backed by real ICMP sockets.
#[derive(Debug, Clone, Copy)]
pub struct IcmpProber {
    privileged: bool,
}

impl IcmpProber {
    pub fn new(privileged: bool) -> Self {
        Self { privileged }
    }
}

#[async_trait]
impl Prober for IcmpProber {
    async fn burst(
        &self,
        dest: &str,
        count: u32,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<PingStats> {
        let pinger = Pinger::new(dest, self.privileged).await?;
        Ok(pinger.burst(count, timeout, &cancel).await?)
    }

    async fn ping_until(
        &self,
        dest: &str,
        timeout: Duration,
        cancel: CancellationToken,
        on_recv: RecvCallback,
    ) -> Result<()> {
        let pinger = Pinger::new(dest, self.privileged).await?;
        Ok(pinger.ping_until(timeout, &cancel, &on_recv).await?)
    }
}

/// An ICMP echo prober bound to one destination.
pub struct Pinger {
    addr: SocketAddr,
    socket: UdpSocket,
    /// Echo identifier. Raw sockets see it echoed back verbatim; DGRAM
    /// sockets have it rewritten by the kernel, so reply matching leans
    /// on the payload token instead.
    ident: u16,
    token: [u8; 8],
    privileged: bool,
}

impl Pinger {
    /// Resolve `host` and open an ICMP socket for its address family.
    ///
    /// Resolution or socket failures surface immediately so that a
    /// misconfigured destination is visible before any probing starts.
    pub async fn new(host: &str, privileged: bool) -> std::result::Result<Self, ProbeError> {
        let ip = resolve(host).await?;
        let socket = open_icmp_socket(ip, privileged)?;

        let mut rng = rand::thread_rng();
        Ok(Self {
            addr: SocketAddr::new(ip, 0),
            socket,
            ident: rng.gen(),
            token: rng.gen(),
            privileged,
        })
    }

    fn is_ipv6(&self) -> bool {
        self.addr.is_ipv6()
    }

    /// Send `count` echo requests, waiting an equal share of `timeout`
    /// for each reply, and report aggregate statistics.
    ///
    /// Cancellation stops the burst between packets and abandons any
    /// outstanding reply wait; packets never sent are not counted.
    pub async fn burst(
        &self,
        count: u32,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> std::result::Result<PingStats, ProbeError> {
        let per_packet = timeout / count.max(1);

        let mut sent = 0u32;
        let mut received = 0u32;
        let mut total_rtt = Duration::ZERO;

        for seq in 0..count as u16 {
            if cancel.is_cancelled() {
                break;
            }

            self.send_echo(seq).await?;
            sent += 1;
            let sent_at = Instant::now();

            if let Some(reply_at) = self.await_reply(seq, per_packet, cancel).await? {
                received += 1;
                total_rtt += reply_at.duration_since(sent_at);
            }
        }

        let avg_rtt = if received > 0 {
            Some(total_rtt / received)
        } else {
            None
        };

        Ok(PingStats {
            sent,
            received,
            avg_rtt,
        })
    }

    /// Send paced echo requests until `cancel` fires or `timeout`
    /// elapses, invoking `on_recv` once per distinct reply.
    pub async fn ping_until(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
        on_recv: &RecvCallback,
    ) -> std::result::Result<(), ProbeError> {
        let deadline = Instant::now() + timeout;
        let mut sent_at: Vec<Instant> = Vec::new();
        let mut seen: HashSet<u16> = HashSet::new();
        let mut buf = [0u8; RECV_BUF_LEN];

        let mut seq: u16 = 0;
        loop {
            let now = Instant::now();
            if cancel.is_cancelled() || now >= deadline {
                return Ok(());
            }

            self.send_echo(seq).await?;
            sent_at.push(now);

            // Listen for the rest of this pacing slot; late replies to
            // earlier requests still count.
            let slot_end = std::cmp::min(now + PING_INTERVAL, deadline);
            loop {
                let remaining = slot_end.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(()),
                    recvd = tokio::time::timeout(remaining, self.socket.recv_from(&mut buf)) => {
                        let Ok(recvd) = recvd else { break };
                        let (len, _from) = recvd.map_err(ProbeError::Socket)?;

                        if let Some(reply) = self.match_reply(&buf[..len]) {
                            let new = usize::from(reply.seq) < sent_at.len()
                                && seen.insert(reply.seq);
                            if new {
                                on_recv(sent_at[usize::from(reply.seq)].elapsed());
                            }
                        }
                    }
                }
            }

            seq = seq.wrapping_add(1);
        }
    }

    async fn send_echo(&self, seq: u16) -> std::result::Result<(), ProbeError> {
        let request = build_echo_request(self.ident, seq, &self.token, self.is_ipv6());
        self.socket
            .send_to(&request, self.addr)
            .await
            .map_err(ProbeError::Socket)?;
        Ok(())
    }

    /// Wait up to `window` for the reply to `seq`. Returns the arrival
    /// instant, or `None` on timeout or cancellation.
    async fn await_reply(
        &self,
        seq: u16,
        window: Duration,
        cancel: &CancellationToken,
    ) -> std::result::Result<Option<Instant>, ProbeError> {
        let deadline = Instant::now() + window;
        let mut buf = [0u8; RECV_BUF_LEN];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(None),
                recvd = tokio::time::timeout(remaining, self.socket.recv_from(&mut buf)) => {
                    let Ok(recvd) = recvd else { return Ok(None) };
                    let (len, _from) = recvd.map_err(ProbeError::Socket)?;

                    match self.match_reply(&buf[..len]) {
                        Some(reply) if reply.seq == seq => return Ok(Some(Instant::now())),
                        _ => {}
                    }
                }
            }
        }
    }

    /// Attribute a received datagram to this pinger, if it is one of
    /// our echo replies.
    fn match_reply(&self, data: &[u8]) -> Option<EchoReply> {
        let icmp = if self.privileged && !self.is_ipv6() {
            strip_ipv4_header(data)?
        } else {
            data
        };

        let reply = parse_echo_reply(icmp, self.is_ipv6())?;
        if reply.token != self.token {
            return None;
        }
        // DGRAM sockets rewrite the identifier on the way out, so it
        // only has to match on raw sockets.
        if self.privileged && reply.ident != self.ident {
            return None;
        }

        Some(reply)
    }
}

async fn resolve(host: &str) -> std::result::Result<IpAddr, ProbeError> {
    // Accept bare addresses without consulting the resolver.
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let mut addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| ProbeError::Resolve {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

    addrs
        .next()
        .map(|a| a.ip())
        .ok_or_else(|| ProbeError::Resolve {
            host: host.to_string(),
            reason: "no addresses returned".to_string(),
        })
}

fn open_icmp_socket(
    ip: IpAddr,
    privileged: bool,
) -> std::result::Result<UdpSocket, ProbeError> {
    let (domain, protocol) = match ip {
        IpAddr::V4(_) => (Domain::IPV4, Protocol::ICMPV4),
        IpAddr::V6(_) => (Domain::IPV6, Protocol::ICMPV6),
    };
    let ty = if privileged { Type::RAW } else { Type::DGRAM };

    let socket = Socket::new(domain, ty, Some(protocol)).map_err(ProbeError::Socket)?;
    socket.set_nonblocking(true).map_err(ProbeError::Socket)?;

    UdpSocket::from_std(std::net::UdpSocket::from(socket)).map_err(ProbeError::Socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_pct() {
        let stats = PingStats {
            sent: 3,
            received: 2,
            avg_rtt: Some(Duration::from_millis(20)),
        };
        assert!((stats.loss_pct() - 100.0 / 3.0).abs() < 1e-9);

        let all_lost = PingStats {
            sent: 3,
            received: 0,
            avg_rtt: None,
        };
        assert!((all_lost.loss_pct() - 100.0).abs() < f64::EPSILON);

        let none_sent = PingStats {
            sent: 0,
            received: 0,
            avg_rtt: None,
        };
        assert!((none_sent.loss_pct() - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_resolve_accepts_literal_addresses() {
        assert_eq!(
            resolve("1.1.1.1").await.unwrap(),
            "1.1.1.1".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            resolve("::1").await.unwrap(),
            "::1".parse::<IpAddr>().unwrap()
        );
    }
}
