// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use log::{debug, warn};
use thiserror::Error;

use crate::transport::is_transient;
use crate::Transport;

/// Bigger than any upstream answer to a query without EDNS.
const MAX_REPLY_SIZE: usize = 4096;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_ATTEMPTS: u8 = 2;
const DEFAULT_MAX_IN_FLIGHT: usize = 256;

/// Takes care of the queries that are not blocked.
///
/// A forwarder gets the socket the query came from, the query as received and the client
/// address. It owns everything that happens next, including sending a reply through `conn`,
/// and must return without waiting for it.
pub trait Forwarder: Send + Sync + 'static {
    /// Hand off a query. Returns immediately.
    fn forward(&self, conn: Arc<dyn Transport>, packet: &[u8], client: SocketAddr);
}

/// `None` drops every query it is given.
impl<F: Forwarder> Forwarder for Option<F> {
    #[inline]
    fn forward(&self, conn: Arc<dyn Transport>, packet: &[u8], client: SocketAddr) {
        match self {
            Some(forwarder) => forwarder.forward(conn, packet, client),
            None => debug!("no upstream configured, dropping query from {client}"),
        }
    }
}

/// Relay queries to a single upstream resolver over UDP.
///
/// Each query is sent from a fresh ephemeral socket in its own thread. The first reply
/// carrying the query id is relayed to the client; if none arrives within the timeout the
/// query is sent again, up to the configured number of attempts, and then given up.
///
/// At most [max_in_flight](UpstreamForwarder::max_in_flight) queries are forwarded at the
/// same time. Queries arriving while every slot is taken are dropped. Clones share the
/// same slots.
#[derive(Clone, Debug)]
pub struct UpstreamForwarder {
    upstream: SocketAddr,
    timeout: Duration,
    attempts: u8,
    max_in_flight: usize,
    in_flight: Arc<AtomicUsize>,
}

impl UpstreamForwarder {
    /// Forward to `upstream` with a 2 second timeout and 2 attempts.
    pub fn new(upstream: SocketAddr) -> Self {
        UpstreamForwarder {
            upstream,
            timeout: DEFAULT_TIMEOUT,
            attempts: DEFAULT_ATTEMPTS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set how long to wait for the upstream reply on each attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how many times a query is sent before giving up. At least one.
    pub fn attempts(mut self, attempts: u8) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Set how many queries can wait for the upstream at the same time. At least one.
    pub fn max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max.max(1);
        self
    }

    /// Number of queries currently waiting for the upstream.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// The upstream resolver address.
    pub fn upstream(&self) -> SocketAddr {
        self.upstream
    }

    /// Send `packet` upstream and wait for the matching reply.
    pub fn exchange(&self, packet: &[u8]) -> Result<Vec<u8>, ForwardError> {
        let id = packet.get(..2).ok_or(ForwardError::ShortQuery(packet.len()))?;
        let local: SocketAddr = if self.upstream.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect(self.upstream)?;
        socket.set_read_timeout(Some(self.timeout))?;

        let mut buff = vec![0u8; MAX_REPLY_SIZE];
        for attempt in 1..=self.attempts {
            socket.send(packet)?;
            match wait_reply(&socket, &mut buff, id) {
                Ok(n) => return Ok(buff[..n].to_vec()),
                Err(e) if is_transient(&e) => {
                    debug!("attempt {attempt} to {} timed out", self.upstream)
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ForwardError::Timeout(self.attempts))
    }

    fn acquire(&self) -> Option<Slot> {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_in_flight).then_some(n + 1)
            })
            .ok()?;
        Some(Slot(Arc::clone(&self.in_flight)))
    }
}

/// A taken forwarding slot, given back on drop.
struct Slot(Arc<AtomicUsize>);

impl Drop for Slot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Forwarder for UpstreamForwarder {
    fn forward(&self, conn: Arc<dyn Transport>, packet: &[u8], client: SocketAddr) {
        let slot = match self.acquire() {
            Some(slot) => slot,
            None => {
                warn!(
                    "{} queries already waiting for {}, dropping query from {client}",
                    self.max_in_flight, self.upstream
                );
                return;
            }
        };
        let this = self.clone();
        let packet = packet.to_vec();
        let spawned = thread::Builder::new()
            .name("sinkhole-forward".into())
            .spawn(move || {
                let _slot = slot;
                match this.exchange(&packet) {
                    Ok(reply) => {
                        if let Err(e) = conn.send_to(&reply, client) {
                            debug!("could not relay upstream reply to {client}: {e}");
                        }
                    }
                    Err(e) => {
                        debug!("forwarding query from {client} to {} failed: {e}", this.upstream)
                    }
                }
            });
        if let Err(e) = spawned {
            warn!("could not spawn a forwarding thread, dropping query from {client}: {e}");
        }
    }
}

/// Replies with a different id are stale answers to an earlier attempt and are skipped.
fn wait_reply(socket: &UdpSocket, buff: &mut [u8], id: &[u8]) -> io::Result<usize> {
    loop {
        let n = socket.recv(buff)?;
        if n >= 2 && buff[..2] == *id {
            return Ok(n);
        }
    }
}

/// The upstream resolver did not provide an answer.
#[derive(Error, Debug)]
pub enum ForwardError {
    /// Socket error talking to the upstream resolver.
    #[error("upstream socket error: {0}")]
    Io(#[from] io::Error),
    /// No reply after every attempt.
    #[error("no reply after {0} attempts")]
    Timeout(u8),
    /// The query is too short to carry an id.
    #[error("query of {0} bytes has no id")]
    ShortQuery(usize),
}
