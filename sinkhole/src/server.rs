// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    io,
    net::{SocketAddr, UdpSocket},
    sync::{mpsc, Arc},
    thread,
};

use log::{debug, error, info, warn};
use sinkhole_parser::DnsRequest;
use thiserror::Error;

use crate::transport::is_transient;
use crate::{Forwarder, QueryGate, Transport};

/// Size of the receive buffer of each listener, enough for any UDP payload.
pub const RECV_BUFFER_SIZE: usize = 65_535;

#[doc(hidden)]
#[derive(Clone, Copy, Debug)]
pub struct Builder;
#[doc(hidden)]
#[derive(Debug)]
pub struct Runner<T> {
    transport: Arc<T>,
}

/// A sinkhole DNS server.
///
/// A number of listener threads share a single socket. Each one reads a datagram, decodes
/// it, asks the [QueryGate] what to do and either sends back the answer or hands the
/// datagram to the [Forwarder].
///
/// ```no_run
/// use sinkhole::{BlockSet, Server};
///
/// let blocked: BlockSet = ["ads.example.com."].into_iter().collect();
/// let error = Server::new()
///     .threads(4)
///     .bind("127.0.0.5:53".parse().unwrap())
///     .unwrap()
///     .serve(blocked, None::<sinkhole::UpstreamForwarder>);
/// eprintln!("server stopped: {error}");
/// ```
#[derive(Debug)]
pub struct Server<S> {
    threads: usize,
    state: S,
}

impl Default for Server<Builder> {
    fn default() -> Self {
        Server {
            threads: 1,
            state: Builder,
        }
    }
}

impl Server<Builder> {
    /// Create a new [Server] with a single listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of listener threads. At least one is always started.
    pub fn threads(mut self, n: usize) -> Self {
        self.threads = n.max(1);
        self
    }

    /// Bind a UDP socket to `addr` to listen for queries.
    pub fn bind(self, addr: SocketAddr) -> Result<Server<Runner<UdpSocket>>, io::Error> {
        Ok(self.transport(UdpSocket::bind(addr)?))
    }

    /// Listen for queries on an already open [Transport].
    pub fn transport<T: Transport>(self, transport: T) -> Server<Runner<T>> {
        Server {
            threads: self.threads,
            state: Runner {
                transport: Arc::new(transport),
            },
        }
    }
}

impl Server<Runner<UdpSocket>> {
    /// The address the socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.state.transport.local_addr()
    }
}

impl<T: Transport> Server<Runner<T>> {
    /// Start the listeners and block until one of them fails.
    ///
    /// Malformed queries and failures to send a reply only drop the datagram involved. A
    /// listener stops when reading from the socket fails with a non transient error; the
    /// first listener to stop makes `serve` return its error. The other listeners are left
    /// as they are, the caller is expected to shut the process down.
    pub fn serve<G, F>(self, gate: G, forwarder: F) -> ServeError
    where
        G: QueryGate + Send + Sync + 'static,
        F: Forwarder,
    {
        let gate = Arc::new(gate);
        let forwarder = Arc::new(forwarder);
        let (tx, rx) = mpsc::channel();

        for worker in 0..self.threads {
            let transport = Arc::clone(&self.state.transport);
            let gate = Arc::clone(&gate);
            let forwarder = Arc::clone(&forwarder);
            let tx = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("sinkhole-listener-{worker}"))
                .spawn(move || {
                    let source = listen(&transport, gate.as_ref(), forwarder.as_ref());
                    error!("listener {worker} failed: {source}");
                    // Nobody is waiting anymore once `serve` returned the first failure.
                    let _ = tx.send(ServeError::SocketFatal { worker, source });
                });
            if let Err(source) = spawned {
                return ServeError::Spawn { worker, source };
            }
        }
        drop(tx);
        info!("serving with {} listeners", self.threads);

        rx.recv().unwrap_or(ServeError::Vanished)
    }
}

fn listen<T, G, F>(transport: &Arc<T>, gate: &G, forwarder: &F) -> io::Error
where
    T: Transport,
    G: QueryGate,
    F: Forwarder,
{
    let mut buff = vec![0u8; RECV_BUFFER_SIZE];
    loop {
        let (n, src) = match transport.recv_from(&mut buff) {
            Ok(received) => received,
            Err(e) if is_transient(&e) => continue,
            Err(e) => return e,
        };
        handle(transport, gate, forwarder, &buff[..n], src);
    }
}

fn handle<T, G, F>(transport: &Arc<T>, gate: &G, forwarder: &F, packet: &[u8], client: SocketAddr)
where
    T: Transport,
    G: QueryGate,
    F: Forwarder,
{
    let request = match DnsRequest::try_from(packet) {
        Ok(request) => request,
        Err(e) => {
            warn!("dropping malformed query from {client}: {e}");
            return;
        }
    };
    debug!("{client} asked for {}", request.question.name);

    match gate.run(client, request) {
        Some(answer) => {
            let reply = match Vec::<u8>::try_from(&answer) {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("not answering {client}: {e}");
                    return;
                }
            };
            if let Err(e) = transport.send_to(&reply, client) {
                warn!("could not answer {client}: {e}");
            }
        }
        None => {
            let conn: Arc<dyn Transport> = transport.clone();
            forwarder.forward(conn, packet, client);
        }
    }
}

/// Why [Server::serve] returned.
#[derive(Error, Debug)]
pub enum ServeError {
    /// A listener could not read from the socket anymore.
    #[error("listener {worker} could not read from the socket: {source}")]
    SocketFatal {
        /// Index of the listener that failed.
        worker: usize,
        /// The read error.
        source: io::Error,
    },
    /// A listener thread could not be started.
    #[error("could not start listener {worker}: {source}")]
    Spawn {
        /// Index of the listener that could not be started.
        worker: usize,
        /// The spawn error.
        source: io::Error,
    },
    /// Every listener ended without reporting an error, which only happens if they panicked.
    #[error("every listener stopped without reporting an error")]
    Vanished,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockSet;
    use std::sync::Mutex;

    const BLOCKED: &[u8] = &[
        0xAB, 0xCD, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // header
        3, 97, 100, 115, 3, 99, 111, 109, 0, // ads.com
        0, 1, 0, 1,
    ];

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
    }

    impl Transport for Recorder {
        fn recv_from(&self, _: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
            Err(io::ErrorKind::Other.into())
        }

        fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
            self.sent.lock().unwrap().push((buf.to_vec(), target));
            Ok(buf.len())
        }
    }

    #[derive(Default)]
    struct Forwarded(Mutex<Vec<(Vec<u8>, SocketAddr)>>);

    impl Forwarder for Forwarded {
        fn forward(&self, _: Arc<dyn Transport>, packet: &[u8], client: SocketAddr) {
            self.0.lock().unwrap().push((packet.to_vec(), client));
        }
    }

    fn client() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[test]
    fn handle_blocked() {
        let transport = Arc::new(Recorder::default());
        let forwarder = Forwarded::default();
        let gate: BlockSet = ["ads.com."].into_iter().collect();

        handle(&transport, &gate, &forwarder, BLOCKED, client());

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, client());
        assert_eq!(&sent[0].0[..2], &[0xAB, 0xCD]);
        assert!(forwarder.0.lock().unwrap().is_empty());
    }

    #[test]
    fn handle_allowed() {
        let transport = Arc::new(Recorder::default());
        let forwarder = Forwarded::default();
        let gate = BlockSet::new();

        handle(&transport, &gate, &forwarder, BLOCKED, client());

        assert!(transport.sent.lock().unwrap().is_empty());
        let forwarded = forwarder.0.lock().unwrap();
        assert_eq!(*forwarded, vec![(BLOCKED.to_vec(), client())]);
    }

    #[test]
    fn handle_malformed() {
        let transport = Arc::new(Recorder::default());
        let forwarder = Forwarded::default();
        let gate: BlockSet = ["ads.com."].into_iter().collect();

        handle(&transport, &gate, &forwarder, &BLOCKED[..11], client());
        handle(&transport, &gate, &forwarder, &BLOCKED[..20], client());

        assert!(transport.sent.lock().unwrap().is_empty());
        assert!(forwarder.0.lock().unwrap().is_empty());
    }

    #[test]
    fn listen_stops_on_fatal_read() {
        let transport = Arc::new(Recorder::default());
        let e = listen(&transport, &BlockSet::new(), &Forwarded::default());
        assert_eq!(e.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn at_least_one_thread() {
        let server = Server::new().threads(0);
        assert_eq!(server.threads, 1);
    }
}
